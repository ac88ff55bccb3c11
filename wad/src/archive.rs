use super::errors::{Error, Result};
use super::name::WadName;
use super::types::{WadInfo, WadLump};
use log::info;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Take};
use std::mem;
use std::path::Path;
use std::str::FromStr;

/// A read-only view over a WAD archive's lump directory.
#[derive(Debug)]
pub struct Archive {
    file: RefCell<BufReader<File>>,
    index_map: IndexMap<WadName, usize>,
    lumps: Vec<LumpInfo>,
    levels: Vec<usize>,
}

impl Archive {
    pub fn open<W: AsRef<Path>>(wad_path: W) -> Result<Archive> {
        let wad_path = wad_path.as_ref().to_owned();
        info!("Loading wad file {:?}...", wad_path);

        let mut file =
            BufReader::new(File::open(&wad_path).map_err(Error::on_file_open)?);

        let header: WadInfo =
            bincode::deserialize_from(&mut file).map_err(Error::bad_wad_header)?;

        if &header.identifier != IWAD_HEADER && &header.identifier != PWAD_HEADER {
            return Err(Error::bad_wad_header_identifier(&header.identifier));
        }

        // Read lump info.
        let mut lumps = Vec::with_capacity(header.num_lumps as usize);
        let mut levels = Vec::with_capacity(16);
        let mut index_map = IndexMap::new();

        file.seek(SeekFrom::Start(header.info_table_offset as u64))
            .map_err(Error::seeking_to_info_table_offset(
                header.info_table_offset,
            ))?;
        for i_lump in 0..header.num_lumps {
            let fileinfo: WadLump = bincode::deserialize_from(&mut file)
                .map_err(Error::bad_lump_info(i_lump))?;

            index_map.insert(fileinfo.name, lumps.len());
            lumps.push(LumpInfo {
                name: fileinfo.name,
                offset: fileinfo.file_pos as u64,
                size: fileinfo.size as usize,
            });

            // Level marker lumps are the ones immediately preceeding a
            // "THINGS" lump.
            if &fileinfo.name == b"THINGS\0\0" {
                assert!(i_lump > 0);
                levels.push((i_lump - 1) as usize);
            }
        }

        Ok(Archive {
            file: RefCell::new(file),
            index_map,
            lumps,
            levels,
        })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level_lump(&self, level_index: usize) -> Result<LumpReader> {
        self.lump_by_index(
            *self
                .levels
                .get(level_index)
                .ok_or_else(|| Error::missing_required_lump(&level_index))?,
        )
    }

    pub fn required_named_lump(&self, name: &str) -> Result<LumpReader> {
        self.named_lump(name)?
            .ok_or_else(|| Error::missing_required_lump(&name))
    }

    pub fn named_lump(&self, name: &str) -> Result<Option<LumpReader>> {
        let name = WadName::from_str(name)?;
        match self.index_map.get(&name) {
            Some(&index) => self.lump_by_index(index).map(Some),
            None => Ok(None),
        }
    }

    pub fn lump_by_index(&self, index: usize) -> Result<LumpReader> {
        Ok(LumpReader {
            archive: self,
            info: self
                .lumps
                .get(index)
                .ok_or_else(|| Error::missing_required_lump(&index))?,
            index,
        })
    }
}

#[derive(Copy, Clone, Debug)]
pub struct LumpReader<'a> {
    archive: &'a Archive,
    info: &'a LumpInfo,
    index: usize,
}

impl<'a> LumpReader<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> WadName {
        self.info.name
    }

    /// Decodes the lump as a tightly packed array of `T`. An empty lump
    /// decodes to an empty vector.
    pub fn decode_vec<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let LumpReader { info, index, .. } = *self;
        if info.size == 0 {
            return Ok(Vec::new());
        }
        self.read(|mut file| {
            let element_size = mem::size_of::<T>();
            let num_elements = info.size / element_size;

            if info.size % element_size != 0 {
                return Err(Error::bad_lump_size(
                    index,
                    info.name.as_ref(),
                    info.size,
                    element_size,
                ));
            }
            (0..num_elements)
                .map(move |i_element| {
                    bincode::deserialize_from(&mut file)
                        .map_err(Error::bad_lump_element(index, info.name.as_ref(), i_element))
                })
                .collect()
        })
    }

    pub fn read_bytes_into(&self, bytes: &mut Vec<u8>) -> Result<()> {
        let LumpReader { info, index, .. } = *self;
        self.read(|file| {
            let old_size = bytes.len();
            bytes.resize(old_size + info.size, 0u8);
            file.read_exact(&mut bytes[old_size..])
                .map_err(Error::reading_lump(index, info.name.as_ref()))?;
            Ok(())
        })
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.read_bytes_into(&mut bytes).map(|_| bytes)
    }

    fn read<F, T>(&self, with: F) -> Result<T>
    where
        F: FnOnce(&mut Take<&mut BufReader<File>>) -> Result<T>,
    {
        let LumpReader {
            info,
            index,
            archive,
        } = *self;
        let mut file = archive.file.borrow_mut();
        file.seek(SeekFrom::Start(info.offset))
            .map_err(Error::seeking_to_lump(index, info.name.as_ref()))?;
        with(&mut Read::take(&mut *file, info.size as u64))
    }
}

#[derive(Copy, Clone, Debug)]
struct LumpInfo {
    name: WadName,
    offset: u64,
    size: usize,
}

const IWAD_HEADER: &[u8; 4] = b"IWAD";
const PWAD_HEADER: &[u8; 4] = b"PWAD";
