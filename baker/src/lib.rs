mod errors;

pub mod lightmap;
pub mod lump;
pub mod map;
pub mod surfaces;
pub mod trace;

pub use crate::errors::{Error, Result, ResultExt};
pub use crate::lightmap::{BakeConfig, LightmapBuilder, LIGHTMAP_MAX_SIZE};
pub use crate::lump::{read_lightmap_lump, write_lightmap_lump, LightmapLump};
pub use crate::map::{DoomMap, NodeChild};
pub use crate::surfaces::{build_surfaces, Surface, SurfaceKind};
pub use crate::trace::Trace;
