use crate::errors::Result;
use crate::map::DoomMap;
use log::{info, warn};
use math::{Plane, Vec2f, Vec3f};
use num_traits::Zero;
use wad::types::WadSeg;
use wad::util::{from_wad_coord, is_untextured};

/// What part of the map a surface shades. The discriminants are the wire
/// values written into the lightmap lump.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SurfaceKind {
    MiddleWall = 0,
    UpperWall = 1,
    LowerWall = 2,
    Floor = 3,
    Ceiling = 4,
}

impl SurfaceKind {
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(value: u16) -> Option<SurfaceKind> {
        Some(match value {
            0 => SurfaceKind::MiddleWall,
            1 => SurfaceKind::UpperWall,
            2 => SurfaceKind::LowerWall,
            3 => SurfaceKind::Floor,
            4 => SurfaceKind::Ceiling,
            _ => return None,
        })
    }
}

/// Atlas placement and texel parameterization, filled in by the lightmap
/// builder after extraction.
#[derive(Clone, Debug)]
pub struct LightmapInfo {
    pub texture: usize,
    pub offs: [usize; 2],
    pub dims: [usize; 2],
    pub origin: Vec3f,
    pub steps: [Vec3f; 2],
    /// Interleaved (u, v) atlas coordinates, one pair per polygon vertex.
    pub coords: Vec<f32>,
}

impl Default for LightmapInfo {
    fn default() -> Self {
        LightmapInfo {
            texture: 0,
            offs: [0, 0],
            dims: [0, 0],
            origin: Vec3f::zero(),
            steps: [Vec3f::zero(); 2],
            coords: Vec::new(),
        }
    }
}

/// A renderable polygon derived from the map: a wall quad or a subsector
/// floor/ceiling fan, always coplanar with its stored plane.
pub struct Surface {
    pub kind: SurfaceKind,
    /// Index of the source seg (walls) or subsector (flats).
    pub type_index: u16,
    pub verts: Vec<Vec3f>,
    pub plane: Plane,
    pub lightmap: LightmapInfo,
}

impl Surface {
    fn new(kind: SurfaceKind, type_index: u16, verts: Vec<Vec3f>, plane: Plane) -> Surface {
        Surface {
            kind,
            type_index,
            verts,
            plane,
            lightmap: LightmapInfo::default(),
        }
    }
}

/// Derives the global surface list: every seg's wall quads first, then
/// every subsector's floor/ceiling pair. The order is load-bearing; the
/// lightmap lump indexes surfaces by it.
pub fn build_surfaces(map: &DoomMap) -> Result<Vec<Surface>> {
    let mut surfaces = Vec::with_capacity(map.segs.len() + map.subsectors.len() * 2);

    info!("Building seg surfaces...");
    for (seg_index, seg) in map.segs.iter().enumerate() {
        surfaces_from_seg(map, seg_index, seg, &mut surfaces);
    }
    let num_seg_surfaces = surfaces.len();
    info!("Seg surfaces: {}", num_seg_surfaces);

    info!("Building leaf surfaces...");
    for subsector_index in 0..map.subsectors.len() {
        surfaces_from_subsector(map, subsector_index, &mut surfaces)?;
    }
    info!("Leaf surfaces: {}", surfaces.len() - num_seg_surfaces);
    info!("Surfaces total: {}", surfaces.len());

    Ok(surfaces)
}

fn surfaces_from_seg(
    map: &DoomMap,
    seg_index: usize,
    seg: &WadSeg,
    surfaces: &mut Vec<Surface>,
) {
    if map.seg_linedef(seg).is_none() {
        return;
    }
    let (side, front) = match (map.seg_sidedef(seg), map.seg_front_sector(seg)) {
        (Some(side), Some(front)) => (side, front),
        _ => {
            warn!("Seg {} has no front side, skipping.", seg_index);
            return;
        }
    };
    let (v1, v2) = match (map.vertex(seg.start_vertex), map.vertex(seg.end_vertex)) {
        (Some(v1), Some(v2)) => (v1, v2),
        _ => {
            warn!("Seg {} has out of range vertices, skipping.", seg_index);
            return;
        }
    };

    let top = from_wad_coord(front.ceiling_height);
    let bottom = from_wad_coord(front.floor_height);

    let back = match map.seg_back_sector(seg) {
        None => {
            // One-sided wall spans the full front sector height.
            push_wall(
                surfaces,
                SurfaceKind::MiddleWall,
                seg_index,
                v1,
                v2,
                bottom,
                top,
            );
            return;
        }
        Some(back) => back,
    };

    let back_top = from_wad_coord(back.ceiling_height);
    let back_bottom = from_wad_coord(back.floor_height);

    if back_top == top && back_bottom == bottom {
        return;
    }

    if bottom < back_bottom && !is_untextured(side.lower_texture) {
        push_wall(
            surfaces,
            SurfaceKind::LowerWall,
            seg_index,
            v1,
            v2,
            bottom,
            back_bottom,
        );
    }
    if top > back_top && !is_untextured(side.upper_texture) {
        push_wall(
            surfaces,
            SurfaceKind::UpperWall,
            seg_index,
            v1,
            v2,
            back_top,
            top,
        );
    }
}

fn push_wall(
    surfaces: &mut Vec<Surface>,
    kind: SurfaceKind,
    seg_index: usize,
    v1: Vec2f,
    v2: Vec2f,
    bottom: f32,
    top: f32,
) {
    // Verts 0 and 2 sit on v1, 1 and 3 on v2; the lower pair first. The
    // (0, 1, 2) winding makes the plane normal face the front sector.
    let verts = vec![
        Vec3f::new(v1[0], v1[1], bottom),
        Vec3f::new(v2[0], v2[1], bottom),
        Vec3f::new(v1[0], v1[1], top),
        Vec3f::new(v2[0], v2[1], top),
    ];
    let plane = Plane::from_points(verts[0], verts[1], verts[2]);
    surfaces.push(Surface::new(kind, seg_index as u16, verts, plane));
}

fn surfaces_from_subsector(
    map: &DoomMap,
    subsector_index: usize,
    surfaces: &mut Vec<Surface>,
) -> Result<()> {
    let num_verts = map.leaf_counts[subsector_index];
    if num_verts < 3 {
        return Ok(());
    }
    let sector = map
        .subsector_sector(subsector_index)
        .ok_or_else(|| format!("subsector {} has no sector", subsector_index))?;
    let leafs = map.subsector_leafs(subsector_index);

    let floor_height = from_wad_coord(sector.floor_height);
    let ceiling_height = from_wad_coord(sector.ceiling_height);

    // Floor fan in reverse leaf order, so it winds to face up.
    let floor_verts: Vec<Vec3f> = leafs
        .iter()
        .rev()
        .filter_map(|leaf| map.vertex(leaf.vertex))
        .map(|v| Vec3f::new(v[0], v[1], floor_height))
        .collect();
    if floor_verts.len() < 3 {
        warn!(
            "Subsector {} has out of range fan vertices, skipping.",
            subsector_index
        );
        return Ok(());
    }
    let floor_plane = Plane::from_point(Vec3f::new(0.0, 0.0, 1.0), floor_verts[0]);
    surfaces.push(Surface::new(
        SurfaceKind::Floor,
        subsector_index as u16,
        floor_verts,
        floor_plane,
    ));

    let ceiling_verts: Vec<Vec3f> = leafs
        .iter()
        .filter_map(|leaf| map.vertex(leaf.vertex))
        .map(|v| Vec3f::new(v[0], v[1], ceiling_height))
        .collect();
    let ceiling_plane = Plane::from_point(Vec3f::new(0.0, 0.0, -1.0), ceiling_verts[0]);
    surfaces.push(Surface::new(
        SurfaceKind::Ceiling,
        subsector_index as u16,
        ceiling_verts,
        ceiling_plane,
    ));

    Ok(())
}
