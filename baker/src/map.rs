use crate::errors::Result;
use byteorder::{ByteOrder, LittleEndian};
use log::info;
use math::Vec2f;
use serde::de::DeserializeOwned;
use wad::types::{
    ChildId, SegId, VertexId, WadLight, WadLinedef, WadNode, WadSector, WadSeg, WadSidedef,
    WadSubsector, WadThing, WadVertex, NO_INDEX,
};
use std::str::FromStr;
use wad::util::{from_fixed_coords, parse_child_id};
use wad::{Archive, WadName};

const THINGS_OFFSET: usize = 1;
const LINEDEFS_OFFSET: usize = 2;
const SIDEDEFS_OFFSET: usize = 3;
const VERTICES_OFFSET: usize = 4;
const SEGS_OFFSET: usize = 5;
const SSECTORS_OFFSET: usize = 6;
const NODES_OFFSET: usize = 7;
const SECTORS_OFFSET: usize = 8;
const LEAFS_OFFSET: usize = 11;
const LIGHTS_OFFSET: usize = 12;

/// One entry of a subsector's convex vertex fan: a vertex and the seg that
/// produced it, when one did.
#[derive(Copy, Clone, Debug)]
pub struct Leaf {
    pub vertex: VertexId,
    pub seg: Option<SegId>,
}

/// A decoded BSP child reference.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NodeChild {
    Branch(usize),
    Leaf(usize),
}

impl NodeChild {
    pub fn of(id: ChildId) -> NodeChild {
        let (index, is_leaf) = parse_child_id(id);
        if is_leaf {
            NodeChild::Leaf(index)
        } else {
            NodeChild::Branch(index)
        }
    }
}

/// Typed, read-only view over a level's map lumps.
pub struct DoomMap {
    pub things: Vec<WadThing>,
    pub linedefs: Vec<WadLinedef>,
    pub sidedefs: Vec<WadSidedef>,
    pub vertices: Vec<WadVertex>,
    pub segs: Vec<WadSeg>,
    pub subsectors: Vec<WadSubsector>,
    pub nodes: Vec<WadNode>,
    pub sectors: Vec<WadSector>,
    pub lights: Vec<WadLight>,

    /// Flattened per-subsector vertex fans decoded from the LEAFS lump.
    pub leafs: Vec<Leaf>,
    pub leaf_lookup: Vec<usize>,
    pub leaf_counts: Vec<usize>,
}

impl DoomMap {
    pub fn from_archive(wad: &Archive, level_index: usize) -> Result<DoomMap> {
        let marker = wad.level_lump(level_index)?;
        let start_index = marker.index();
        info!("Reading level data for '{}'...", marker.name());

        let things = optional_lump(wad, start_index + THINGS_OFFSET, "THINGS")?;
        let linedefs = optional_lump(wad, start_index + LINEDEFS_OFFSET, "LINEDEFS")?;
        let sidedefs = optional_lump(wad, start_index + SIDEDEFS_OFFSET, "SIDEDEFS")?;
        let vertices = optional_lump(wad, start_index + VERTICES_OFFSET, "VERTEXES")?;
        let segs = required_lump(wad, start_index + SEGS_OFFSET, "SEGS")?;
        let subsectors = required_lump(wad, start_index + SSECTORS_OFFSET, "SSECTORS")?;
        let nodes = required_lump(wad, start_index + NODES_OFFSET, "NODES")?;
        let sectors = optional_lump(wad, start_index + SECTORS_OFFSET, "SECTORS")?;
        let lights: Vec<WadLight> = optional_lump(wad, start_index + LIGHTS_OFFSET, "LIGHTS")?;

        let leaf_bytes = match lump_if_named(wad, start_index + LEAFS_OFFSET, "LEAFS") {
            Some(lump) => lump.read_bytes()?,
            None => Vec::new(),
        };

        info!("Loaded level '{}':", marker.name());
        info!("    {:4} things", things.len());
        info!("    {:4} linedefs", linedefs.len());
        info!("    {:4} sidedefs", sidedefs.len());
        info!("    {:4} vertices", vertices.len());
        info!("    {:4} segs", segs.len());
        info!("    {:4} subsectors", subsectors.len());
        info!("    {:4} nodes", nodes.len());
        info!("    {:4} sectors", sectors.len());
        info!("    {:4} lights", lights.len());

        let (leafs, leaf_lookup, leaf_counts) =
            decode_leafs(&leaf_bytes, subsectors.len(), vertices.len(), segs.len())?;

        Ok(DoomMap {
            things,
            linedefs,
            sidedefs,
            vertices,
            segs,
            subsectors,
            nodes,
            sectors,
            lights,
            leafs,
            leaf_lookup,
            leaf_counts,
        })
    }

    pub fn vertex(&self, id: VertexId) -> Option<Vec2f> {
        self.vertices
            .get(id as usize)
            .map(|v| from_fixed_coords(v.x, v.y))
    }

    pub fn seg_linedef(&self, seg: &WadSeg) -> Option<&WadLinedef> {
        if seg.linedef == NO_INDEX {
            return None;
        }
        self.linedefs.get(seg.linedef as usize)
    }

    pub fn seg_sidedef(&self, seg: &WadSeg) -> Option<&WadSidedef> {
        let line = self.seg_linedef(seg)?;
        match line.sides[(seg.direction & 1) as usize] {
            NO_INDEX => None,
            side => self.sidedefs.get(side as usize),
        }
    }

    pub fn seg_front_sector(&self, seg: &WadSeg) -> Option<&WadSector> {
        let side = self.seg_sidedef(seg)?;
        self.sectors.get(side.sector as usize)
    }

    /// Back sector of a seg; present only when the owning linedef is
    /// two-sided.
    pub fn seg_back_sector(&self, seg: &WadSeg) -> Option<&WadSector> {
        let line = self.seg_linedef(seg)?;
        if !line.is_two_sided() {
            return None;
        }
        match line.sides[(seg.direction as usize & 1) ^ 1] {
            NO_INDEX => None,
            side => self
                .sidedefs
                .get(side as usize)
                .and_then(|side| self.sectors.get(side.sector as usize)),
        }
    }

    pub fn ssector_segs(&self, ssector: &WadSubsector) -> Option<&[WadSeg]> {
        let start = ssector.first_seg as usize;
        let end = start + ssector.num_segs as usize;
        if end <= self.segs.len() {
            Some(&self.segs[start..end])
        } else {
            None
        }
    }

    /// Sector a subsector belongs to: the first of its segs with a valid
    /// side decides.
    pub fn subsector_sector(&self, index: usize) -> Option<&WadSector> {
        let segs = self.ssector_segs(self.subsectors.get(index)?)?;
        segs.iter()
            .find(|seg| seg.direction >= 0)
            .and_then(|seg| self.seg_front_sector(seg))
    }

    /// The decoded vertex fan of a subsector.
    pub fn subsector_leafs(&self, index: usize) -> &[Leaf] {
        let start = self.leaf_lookup[index];
        &self.leafs[start..start + self.leaf_counts[index]]
    }
}

fn lump_if_named<'a>(wad: &'a Archive, index: usize, name: &str) -> Option<wad::LumpReader<'a>> {
    let expected = WadName::from_str(name).ok()?;
    wad.lump_by_index(index)
        .ok()
        .filter(|lump| lump.name() == expected)
}

fn optional_lump<T: DeserializeOwned>(wad: &Archive, index: usize, name: &str) -> Result<Vec<T>> {
    match lump_if_named(wad, index, name) {
        Some(lump) => Ok(lump.decode_vec()?),
        None => Ok(Vec::new()),
    }
}

fn required_lump<T: DeserializeOwned>(wad: &Archive, index: usize, name: &str) -> Result<Vec<T>> {
    match lump_if_named(wad, index, name) {
        Some(lump) => Ok(lump.decode_vec()?),
        None => Err(format!("{} lump not found", name).into()),
    }
}

/// Decodes the packed LEAFS lump: per subsector a `count`, then `count`
/// pairs of (vertex index, seg index or 0xffff). The record count must
/// match the subsector count.
pub fn decode_leafs(
    bytes: &[u8],
    num_subsectors: usize,
    num_vertices: usize,
    num_segs: usize,
) -> Result<(Vec<Leaf>, Vec<usize>, Vec<usize>)> {
    let mut leafs = Vec::new();
    let mut leaf_lookup = Vec::with_capacity(num_subsectors);
    let mut leaf_counts = Vec::with_capacity(num_subsectors);

    let mut offset = 0;
    while offset < bytes.len() {
        if offset + 2 > bytes.len() {
            return Err("truncated LEAFS lump".into());
        }
        let count = LittleEndian::read_u16(&bytes[offset..]) as usize;
        offset += 2;
        if offset + count * 4 > bytes.len() {
            return Err("truncated LEAFS lump".into());
        }

        leaf_lookup.push(leafs.len());
        leaf_counts.push(count);
        for _ in 0..count {
            let vertex = LittleEndian::read_u16(&bytes[offset..]);
            let seg = LittleEndian::read_u16(&bytes[offset + 2..]);
            offset += 4;

            if vertex as usize >= num_vertices {
                return Err(format!(
                    "leaf vertex out of range: {} - {}",
                    vertex, num_vertices
                )
                .into());
            }
            if seg != NO_INDEX && seg as usize >= num_segs {
                return Err(format!("leaf seg out of range: {} - {}", seg, num_segs).into());
            }
            leafs.push(Leaf {
                vertex,
                seg: if seg == NO_INDEX { None } else { Some(seg) },
            });
        }
    }

    if leaf_counts.len() != num_subsectors {
        return Err(format!(
            "leaf/subsector inconsistency: {}/{}",
            leaf_counts.len(),
            num_subsectors
        )
        .into());
    }

    Ok((leafs, leaf_lookup, leaf_counts))
}

/// Hand-built miniature maps shared by the extraction, tracing and
/// lightmap tests.
#[cfg(test)]
pub mod test_fixtures {
    use super::{DoomMap, Leaf};
    use wad::types::{
        WadLight, WadLinedef, WadNode, WadSector, WadSeg, WadSidedef, WadSubsector, WadVertex,
        LINE_TWO_SIDED, NO_INDEX, SUBSECTOR_FLAG,
    };

    pub fn vertex(x: i32, y: i32) -> WadVertex {
        WadVertex {
            x: x << 16,
            y: y << 16,
        }
    }

    pub fn sector(floor_height: i16, ceiling_height: i16) -> WadSector {
        WadSector {
            floor_height,
            ceiling_height,
            floor_texture: 0,
            ceiling_texture: 0,
            colors: [0; 5],
            special_type: 0,
            tag: 0,
            flags: 0,
        }
    }

    pub fn sidedef(sector: i16) -> WadSidedef {
        WadSidedef {
            x_offset: 0,
            y_offset: 0,
            upper_texture: 0,
            lower_texture: 0,
            middle_texture: 0,
            sector,
        }
    }

    pub fn linedef(start_vertex: u16, end_vertex: u16, front: u16, back: u16) -> WadLinedef {
        WadLinedef {
            start_vertex,
            end_vertex,
            flags: if back == NO_INDEX { 0 } else { LINE_TWO_SIDED },
            special_type: 0,
            sector_tag: 0,
            sides: [front, back],
        }
    }

    pub fn seg(start_vertex: u16, end_vertex: u16, linedef: u16, direction: i16) -> WadSeg {
        WadSeg {
            start_vertex,
            end_vertex,
            angle: 0,
            linedef,
            direction,
            offset: 0,
        }
    }

    pub fn light(x: i16, y: i16, z: i16, radius: u16, intensity: u16, rgb: [u8; 3]) -> WadLight {
        WadLight {
            x,
            y,
            z,
            angle: 0,
            radius,
            intensity,
            rgb,
            pad: 0,
        }
    }

    fn fan(entries: &[(u16, u16)]) -> Vec<Leaf> {
        entries
            .iter()
            .map(|&(vertex, seg)| Leaf {
                vertex,
                seg: if seg == NO_INDEX { None } else { Some(seg) },
            })
            .collect()
    }

    /// A single square sector, 64x64 map units, floor 0, ceiling 128,
    /// bounded by four one-sided walls; no BSP nodes (single subsector).
    pub fn one_sided_square() -> DoomMap {
        DoomMap {
            things: vec![],
            linedefs: vec![
                linedef(0, 1, 0, NO_INDEX),
                linedef(1, 2, 1, NO_INDEX),
                linedef(2, 3, 2, NO_INDEX),
                linedef(3, 0, 3, NO_INDEX),
            ],
            sidedefs: (0..4).map(|_| sidedef(0)).collect(),
            vertices: vec![vertex(0, 0), vertex(64, 0), vertex(64, 64), vertex(0, 64)],
            segs: vec![seg(0, 1, 0, 0), seg(1, 2, 1, 0), seg(2, 3, 2, 0), seg(3, 0, 3, 0)],
            subsectors: vec![WadSubsector {
                num_segs: 4,
                first_seg: 0,
            }],
            nodes: vec![],
            sectors: vec![sector(0, 128)],
            lights: vec![],
            leafs: fan(&[(0, 0), (1, 1), (2, 2), (3, 3)]),
            leaf_lookup: vec![0],
            leaf_counts: vec![4],
        }
    }

    /// Two sectors side by side around a shared two-sided linedef at x=64.
    /// The left sector spans floor 0 to ceiling 128, the right floor 32 to
    /// ceiling 96; one BSP node splits them.
    pub fn two_sided_corridor() -> DoomMap {
        DoomMap {
            things: vec![],
            linedefs: vec![
                linedef(0, 1, 0, NO_INDEX),
                linedef(1, 4, 1, 2),
                linedef(4, 5, 3, NO_INDEX),
                linedef(5, 0, 4, NO_INDEX),
                linedef(1, 2, 5, NO_INDEX),
                linedef(2, 3, 6, NO_INDEX),
                linedef(3, 4, 7, NO_INDEX),
            ],
            sidedefs: vec![
                sidedef(0),
                sidedef(0),
                sidedef(1),
                sidedef(0),
                sidedef(0),
                sidedef(1),
                sidedef(1),
                sidedef(1),
            ],
            vertices: vec![
                vertex(0, 0),
                vertex(64, 0),
                vertex(128, 0),
                vertex(128, 64),
                vertex(64, 64),
                vertex(0, 64),
            ],
            segs: vec![
                seg(0, 1, 0, 0),
                seg(1, 4, 1, 0),
                seg(4, 5, 2, 0),
                seg(5, 0, 3, 0),
                seg(1, 2, 4, 0),
                seg(2, 3, 5, 0),
                seg(3, 4, 6, 0),
                seg(4, 1, 1, 1),
            ],
            subsectors: vec![
                WadSubsector {
                    num_segs: 4,
                    first_seg: 0,
                },
                WadSubsector {
                    num_segs: 4,
                    first_seg: 4,
                },
            ],
            nodes: vec![WadNode {
                line_x: 64,
                line_y: 0,
                step_x: 0,
                step_y: 64,
                bounds: [[0; 4]; 2],
                children: [SUBSECTOR_FLAG | 1, SUBSECTOR_FLAG],
            }],
            sectors: vec![sector(0, 128), sector(32, 96)],
            lights: vec![],
            leafs: [
                fan(&[(0, 0), (1, 1), (4, 2), (5, 3)]),
                fan(&[(1, 4), (2, 5), (3, 6), (4, 7)]),
            ]
            .concat(),
            leaf_lookup: vec![0, 4],
            leaf_counts: vec![4, 4],
        }
    }
}
