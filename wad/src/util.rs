use super::types::{ChildId, FixedCoord, TextureId, WadCoord, NO_INDEX, SUBSECTOR_FLAG};
use math::Vec2f;

pub fn is_untextured(id: TextureId) -> bool {
    id == NO_INDEX
}

/// Converts a 16.16 fixed-point coordinate to float map units.
pub fn from_fixed(x: FixedCoord) -> f32 {
    x as f32 / 65536.0
}

pub fn from_fixed_coords(x: FixedCoord, y: FixedCoord) -> Vec2f {
    Vec2f::new(from_fixed(x), from_fixed(y))
}

pub fn from_wad_coord(x: WadCoord) -> f32 {
    f32::from(x)
}

/// Splits a BSP child reference into its index and leaf flag.
pub fn parse_child_id(id: ChildId) -> (usize, bool) {
    ((id & !SUBSECTOR_FLAG) as usize, id & SUBSECTOR_FLAG != 0)
}
