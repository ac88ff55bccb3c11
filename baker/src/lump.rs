use crate::errors::{Result, ResultExt};
use crate::lightmap::LightmapBuilder;
use crate::surfaces::{Surface, SurfaceKind};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Per-surface record of the LIGHTMAP lump.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct LumpSurface {
    pub kind: u16,
    pub type_index: u16,
    pub texture: u16,
    pub uv_count: u16,
    pub uv_offset: u32,
}

/// A decoded LIGHTMAP lump, as read back from a container.
#[derive(Clone, Debug)]
pub struct LightmapLump {
    pub surfaces: Vec<LumpSurface>,
    pub uv: Vec<f32>,
    pub texture_width: u32,
    pub texture_height: u32,
    pub textures: Vec<Vec<u8>>,
}

/// Serializes the baked surfaces and atlas textures into the LIGHTMAP wire
/// format: surface directory, concatenated UV floats, then raw texture
/// buffers, all little-endian.
pub fn write_lightmap_lump(surfaces: &[Surface], builder: &LightmapBuilder) -> Vec<u8> {
    let total_floats: usize = surfaces.iter().map(|s| s.lightmap.coords.len()).sum();
    let textures = builder.textures();
    let texture_bytes: usize = textures.iter().map(|t| t.len()).sum();

    let mut out = Vec::with_capacity(
        4 + surfaces.len() * 12 + 4 + total_floats * 4 + 12 + texture_bytes,
    );

    out.write_u32::<LittleEndian>(surfaces.len() as u32)
        .expect("write to Vec");
    let mut uv_offset = 0u32;
    for surface in surfaces {
        out.write_u16::<LittleEndian>(surface.kind.to_u16())
            .expect("write to Vec");
        out.write_u16::<LittleEndian>(surface.type_index)
            .expect("write to Vec");
        out.write_u16::<LittleEndian>(surface.lightmap.texture as u16)
            .expect("write to Vec");
        out.write_u16::<LittleEndian>(surface.verts.len() as u16)
            .expect("write to Vec");
        out.write_u32::<LittleEndian>(uv_offset).expect("write to Vec");
        uv_offset += surface.lightmap.coords.len() as u32 * 4;
    }

    out.write_u32::<LittleEndian>(total_floats as u32)
        .expect("write to Vec");
    for surface in surfaces {
        for &coord in &surface.lightmap.coords {
            out.write_f32::<LittleEndian>(coord).expect("write to Vec");
        }
    }

    out.write_u32::<LittleEndian>(textures.len() as u32)
        .expect("write to Vec");
    out.write_u32::<LittleEndian>(builder.texture_width() as u32)
        .expect("write to Vec");
    out.write_u32::<LittleEndian>(builder.texture_height() as u32)
        .expect("write to Vec");
    for texture in textures {
        out.extend_from_slice(texture);
    }

    out
}

/// Reads a LIGHTMAP lump back; the inverse of `write_lightmap_lump`.
pub fn read_lightmap_lump(bytes: &[u8]) -> Result<LightmapLump> {
    let mut cursor = Cursor::new(bytes);
    let truncated = |_: &std::io::Error| "truncated LIGHTMAP lump".to_owned();

    let surface_count = cursor.read_u32::<LittleEndian>().err_context(truncated)?;
    if surface_count as usize * 12 > bytes.len() {
        return Err(format!("surface count {} exceeds the lump size", surface_count).into());
    }
    let mut surfaces = Vec::with_capacity(surface_count as usize);
    for _ in 0..surface_count {
        let kind = cursor.read_u16::<LittleEndian>().err_context(truncated)?;
        if SurfaceKind::from_u16(kind).is_none() {
            return Err(format!("invalid surface kind {}", kind).into());
        }
        surfaces.push(LumpSurface {
            kind,
            type_index: cursor.read_u16::<LittleEndian>().err_context(truncated)?,
            texture: cursor.read_u16::<LittleEndian>().err_context(truncated)?,
            uv_count: cursor.read_u16::<LittleEndian>().err_context(truncated)?,
            uv_offset: cursor.read_u32::<LittleEndian>().err_context(truncated)?,
        });
    }

    let total_floats = cursor.read_u32::<LittleEndian>().err_context(truncated)?;
    if total_floats as usize * 4 > bytes.len() {
        return Err(format!("UV float count {} exceeds the lump size", total_floats).into());
    }
    let mut uv = Vec::with_capacity(total_floats as usize);
    for _ in 0..total_floats {
        uv.push(cursor.read_f32::<LittleEndian>().err_context(truncated)?);
    }

    let texture_count = cursor.read_u32::<LittleEndian>().err_context(truncated)?;
    let texture_width = cursor.read_u32::<LittleEndian>().err_context(truncated)?;
    let texture_height = cursor.read_u32::<LittleEndian>().err_context(truncated)?;

    let texture_size = texture_width as usize * texture_height as usize * 3;
    let mut textures = Vec::with_capacity(texture_count as usize);
    for index in 0..texture_count {
        let start = cursor.position() as usize;
        let end = start + texture_size;
        if end > bytes.len() {
            return Err(format!("texture {} extends past the lump end", index).into());
        }
        textures.push(bytes[start..end].to_vec());
        cursor.set_position(end as u64);
    }

    Ok(LightmapLump {
        surfaces,
        uv,
        texture_width,
        texture_height,
        textures,
    })
}
