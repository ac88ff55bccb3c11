use super::errors::{Error, Result};
use super::name::WadName;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use log::info;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// A fully materialized lump, ready to be written back out.
#[derive(Clone, Debug)]
pub struct RawLump {
    pub name: WadName,
    pub data: Vec<u8>,
}

/// Offset of the LIGHTMAP lump from its level marker, per the Doom64 map
/// lump order (marker, THINGS, ..., LEAFS, LIGHTS, MACROS, LIGHTMAP).
const LIGHTMAP_SLOT: usize = 14;

const HEADER_SIZE: usize = 12;
const DIRECTORY_ENTRY_SIZE: usize = 16;

/// Parses a whole WAD image into its identifier and lump list.
pub fn parse_wad(bytes: &[u8]) -> Result<([u8; 4], Vec<RawLump>)> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::wad_too_small(bytes.len()));
    }
    let mut identifier = [0u8; 4];
    identifier.copy_from_slice(&bytes[0..4]);

    let num_lumps = LittleEndian::read_i32(&bytes[4..8]);
    let directory_offset = LittleEndian::read_i32(&bytes[8..12]);

    let directory_end =
        directory_offset as i64 + num_lumps as i64 * DIRECTORY_ENTRY_SIZE as i64;
    if num_lumps < 0 || directory_offset < 0 || directory_end > bytes.len() as i64 {
        return Err(Error::bad_directory(
            directory_offset as i64,
            num_lumps,
            bytes.len(),
        ));
    }

    let mut lumps = Vec::with_capacity(num_lumps as usize);
    for i_lump in 0..num_lumps as usize {
        let entry = directory_offset as usize + i_lump * DIRECTORY_ENTRY_SIZE;
        let file_pos = LittleEndian::read_i32(&bytes[entry..entry + 4]);
        let size = LittleEndian::read_i32(&bytes[entry + 4..entry + 8]);
        let name = WadName::from_bytes(&bytes[entry + 8..entry + 16])?;

        let start = file_pos as i64;
        let end = start + size as i64;
        if start < 0 || end > bytes.len() as i64 {
            return Err(Error::bad_directory(start, size, bytes.len()));
        }
        lumps.push(RawLump {
            name,
            data: bytes[start as usize..end as usize].to_vec(),
        });
    }
    Ok((identifier, lumps))
}

/// Serializes a lump list back into a WAD image: header, lump data in
/// order, then the directory.
pub fn build_wad(identifier: [u8; 4], lumps: &[RawLump]) -> Vec<u8> {
    let data_size: usize = lumps.iter().map(|lump| lump.data.len()).sum();
    let mut out = Vec::with_capacity(
        HEADER_SIZE + data_size + lumps.len() * DIRECTORY_ENTRY_SIZE,
    );

    out.extend_from_slice(&identifier);
    out.write_i32::<LittleEndian>(lumps.len() as i32)
        .expect("write to Vec");
    out.write_i32::<LittleEndian>((HEADER_SIZE + data_size) as i32)
        .expect("write to Vec");

    let mut offsets = Vec::with_capacity(lumps.len());
    for lump in lumps {
        offsets.push(out.len() as i32);
        out.extend_from_slice(&lump.data);
    }
    for (lump, offset) in lumps.iter().zip(offsets) {
        out.write_i32::<LittleEndian>(offset).expect("write to Vec");
        out.write_i32::<LittleEndian>(lump.data.len() as i32)
            .expect("write to Vec");
        out.extend_from_slice(&*lump.name);
    }
    out
}

/// Replaces the level's LIGHTMAP lump, or inserts one at its slot in the
/// map lump sequence when the level has none yet.
pub fn splice_lightmap(lumps: &mut Vec<RawLump>, marker: usize, data: Vec<u8>) -> Result<()> {
    let name = WadName::from_str("LIGHTMAP")?;
    let window_end = (marker + 1 + LIGHTMAP_SLOT).min(lumps.len());
    for lump in &mut lumps[marker + 1..window_end] {
        if lump.name == name {
            lump.data = data;
            return Ok(());
        }
    }
    let at = (marker + LIGHTMAP_SLOT).min(lumps.len());
    lumps.insert(at, RawLump { name, data });
    Ok(())
}

/// Rewrites `source` with the level's lightmap lump swapped in, after
/// copying the original aside. `marker` is the level marker's lump index.
pub fn write_patched<P: AsRef<Path>>(
    source: P,
    output: P,
    marker: usize,
    lightmap: Vec<u8>,
) -> Result<()> {
    let source = source.as_ref();
    let output = output.as_ref();

    let bytes = fs::read(source).map_err(Error::on_file_open)?;
    let (identifier, mut lumps) = parse_wad(&bytes)?;
    splice_lightmap(&mut lumps, marker, lightmap)?;

    if source == output {
        let mut backup = source.as_os_str().to_owned();
        backup.push(".bak");
        fs::write(&backup, &bytes).map_err(Error::on_file_write)?;
        info!("Wrote backup to {:?}", backup);
    }

    fs::write(output, build_wad(identifier, &lumps)).map_err(Error::on_file_write)?;
    info!("Wrote patched wad to {:?}", output);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{build_wad, parse_wad, splice_lightmap, RawLump};
    use std::str::FromStr;

    fn lump(name: &str, data: &[u8]) -> RawLump {
        RawLump {
            name: super::WadName::from_str(name).unwrap(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_wad_round_trip() {
        let lumps = vec![
            lump("MAP01", b""),
            lump("THINGS", b"\x01\x02"),
            lump("VERTEXES", b"\x03\x04\x05\x06"),
        ];
        let bytes = build_wad(*b"PWAD", &lumps);
        let (identifier, parsed) = parse_wad(&bytes).unwrap();
        assert_eq!(&identifier, b"PWAD");
        assert_eq!(parsed.len(), 3);
        for (before, after) in lumps.iter().zip(&parsed) {
            assert_eq!(before.name, after.name);
            assert_eq!(before.data, after.data);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_wad(b"IWAD").is_err());
        // Directory pointing past the end of the file.
        let mut bytes = build_wad(*b"IWAD", &[lump("MAP01", b"")]);
        let len = bytes.len();
        bytes[8] = (len + 40) as u8;
        assert!(parse_wad(&bytes).is_err());
    }

    #[test]
    fn test_splice_replaces_existing() {
        let mut lumps = vec![
            lump("MAP01", b""),
            lump("THINGS", b""),
            lump("LIGHTMAP", b"old"),
        ];
        splice_lightmap(&mut lumps, 0, b"new".to_vec()).unwrap();
        assert_eq!(lumps.len(), 3);
        assert_eq!(lumps[2].data, b"new");
    }

    #[test]
    fn test_splice_inserts_at_end_of_short_map() {
        let mut lumps = vec![lump("MAP01", b""), lump("THINGS", b"")];
        splice_lightmap(&mut lumps, 0, b"lm".to_vec()).unwrap();
        assert_eq!(lumps.len(), 3);
        assert_eq!(&lumps[2].name, b"LIGHTMAP");
        assert_eq!(lumps[2].data, b"lm");
    }
}
