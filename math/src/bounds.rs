use crate::vector::Vec3f;

/// Axis-aligned bounding box grown one point at a time.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct BBox3 {
    pub min: Vec3f,
    pub max: Vec3f,
}

impl BBox3 {
    pub fn new() -> Self {
        BBox3 {
            min: Vec3f::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vec3f::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn add_point(&mut self, p: Vec3f) {
        for axis in 0..3 {
            if p[axis] < self.min[axis] {
                self.min[axis] = p[axis];
            }
            if p[axis] > self.max[axis] {
                self.max[axis] = p[axis];
            }
        }
    }

    pub fn from_points<'a, I: IntoIterator<Item = &'a Vec3f>>(points: I) -> Self {
        let mut bounds = BBox3::new();
        for &point in points {
            bounds.add_point(point);
        }
        bounds
    }
}

impl Default for BBox3 {
    fn default() -> Self {
        BBox3::new()
    }
}

#[cfg(test)]
mod test {
    use super::BBox3;
    use crate::vector::Vec3f;

    #[test]
    fn test_from_points() {
        let points = [
            Vec3f::new(0.0, 64.0, 8.0),
            Vec3f::new(-32.0, 0.0, 128.0),
            Vec3f::new(16.0, -8.0, 64.0),
        ];
        let bounds = BBox3::from_points(&points);
        assert_eq!(bounds.min, Vec3f::new(-32.0, -8.0, 8.0));
        assert_eq!(bounds.max, Vec3f::new(16.0, 64.0, 128.0));
    }
}
