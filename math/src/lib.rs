pub mod bounds;
pub mod plane;
pub mod vector;

pub use self::bounds::BBox3;
pub use self::plane::Plane;
pub use self::vector::{Vec2f, Vec3f};
