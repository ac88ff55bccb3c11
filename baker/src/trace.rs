use crate::map::{DoomMap, NodeChild};
use math::{Vec2f, Vec3f};
use wad::types::{WadNode, WadSeg};

const PARALLEL_EPSILON: f32 = 1e-16;

/// Point-location and line-of-sight queries over a map's BSP tree. All
/// traversals use an explicit stack; corrupt node graphs cannot blow the
/// call stack.
pub struct Trace<'a> {
    map: &'a DoomMap,
}

impl<'a> Trace<'a> {
    pub fn new(map: &'a DoomMap) -> Trace<'a> {
        Trace { map }
    }

    /// Descends from the root to the subsector containing `at`.
    pub fn point_in_subsector(&self, at: Vec2f) -> Option<usize> {
        if self.map.nodes.is_empty() {
            // A map with a single subsector has no nodes at all.
            return if self.map.subsectors.is_empty() {
                None
            } else {
                Some(0)
            };
        }

        let mut child = NodeChild::Branch(self.map.nodes.len() - 1);
        loop {
            match child {
                NodeChild::Leaf(index) => return Some(index),
                NodeChild::Branch(index) => {
                    let node = self.map.nodes.get(index)?;
                    let side = partition_side(node, at);
                    child = NodeChild::of(node.children[side_index(side)]);
                }
            }
        }
    }

    /// Whether any wall blocks the straight segment between `from` and
    /// `to`. Walks every BSP child the 2D segment touches and intersection-
    /// tests the segs of each reached subsector; a one-sided hit blocks
    /// outright, a two-sided hit blocks when the crossing height leaves the
    /// opening between the joined sectors.
    pub fn occluded(&self, from: Vec3f, to: Vec3f) -> bool {
        let from2 = from.to_vec2();
        let to2 = to.to_vec2();

        if self.map.nodes.is_empty() {
            return !self.map.subsectors.is_empty()
                && self.subsector_blocks(0, from, to, from2, to2);
        }

        let mut stack = vec![NodeChild::Branch(self.map.nodes.len() - 1)];
        while let Some(child) = stack.pop() {
            match child {
                NodeChild::Leaf(index) => {
                    if self.subsector_blocks(index, from, to, from2, to2) {
                        return true;
                    }
                }
                NodeChild::Branch(index) => {
                    let node = match self.map.nodes.get(index) {
                        Some(node) => node,
                        None => continue,
                    };
                    let side_from = partition_side(node, from2);
                    let side_to = partition_side(node, to2);
                    let index_from = side_index(side_from);
                    let index_to = side_index(side_to);

                    stack.push(NodeChild::of(node.children[index_from]));
                    if index_from != index_to || side_from == 0.0 || side_to == 0.0 {
                        stack.push(NodeChild::of(node.children[index_from ^ 1]));
                    }
                }
            }
        }
        false
    }

    fn subsector_blocks(
        &self,
        subsector_index: usize,
        from: Vec3f,
        to: Vec3f,
        from2: Vec2f,
        to2: Vec2f,
    ) -> bool {
        let subsector = match self.map.subsectors.get(subsector_index) {
            Some(subsector) => subsector,
            None => return false,
        };
        let segs = match self.map.ssector_segs(subsector) {
            Some(segs) => segs,
            None => return false,
        };

        for seg in segs {
            if self.seg_blocks(seg, from, to, from2, to2) {
                return true;
            }
        }
        false
    }

    fn seg_blocks(&self, seg: &WadSeg, from: Vec3f, to: Vec3f, from2: Vec2f, to2: Vec2f) -> bool {
        if self.map.seg_linedef(seg).is_none() {
            // Minisegs along BSP splits bound no wall.
            return false;
        }
        let (v1, v2) = match (self.map.vertex(seg.start_vertex), self.map.vertex(seg.end_vertex))
        {
            (Some(v1), Some(v2)) => (v1, v2),
            _ => return false,
        };
        let t = match segment_cross(from2, to2, v1, v2) {
            Some(t) => t,
            None => return false,
        };
        let z = from[2] + (to[2] - from[2]) * t;

        let back = match self.map.seg_back_sector(seg) {
            None => return true,
            Some(back) => back,
        };
        let front = match self.map.seg_front_sector(seg) {
            Some(front) => front,
            None => return true,
        };

        let open_bottom = front.floor_height.max(back.floor_height) as f32;
        let open_top = front.ceiling_height.min(back.ceiling_height) as f32;
        z <= open_bottom || z >= open_top
    }
}

/// Signed area of `at` against a node's partition line; the z component of
/// `(p1 - at) x (p1 + delta - at)`.
fn partition_side(node: &WadNode, at: Vec2f) -> f32 {
    let p1 = Vec2f::new(f32::from(node.line_x), f32::from(node.line_y));
    let delta = Vec2f::new(f32::from(node.step_x), f32::from(node.step_y));
    let dp1 = p1 - at;
    let dp2 = (p1 + delta) - at;
    dp1.cross(&dp2)
}

/// Child slot selected by the partition side; negative side (including
/// negative zero) picks the first child.
fn side_index(side: f32) -> usize {
    if side.is_sign_negative() {
        0
    } else {
        1
    }
}

/// Offset of the proper intersection along `a1 -> a2` against the segment
/// `b1 -> b2`, when there is one strictly inside both.
fn segment_cross(a1: Vec2f, a2: Vec2f, b1: Vec2f, b2: Vec2f) -> Option<f32> {
    let da = a2 - a1;
    let db = b2 - b1;
    let denominator = da.cross(&db);
    if denominator.abs() < PARALLEL_EPSILON {
        return None;
    }
    let delta = b1 - a1;
    let t = delta.cross(&db) / denominator;
    let s = delta.cross(&da) / denominator;
    if t > 0.0 && t < 1.0 && s > 0.0 && s < 1.0 {
        Some(t)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::{segment_cross, Trace};
    use crate::map::test_fixtures::{one_sided_square, two_sided_corridor};
    use math::{Vec2f, Vec3f};

    #[test]
    fn test_segment_cross() {
        let t = segment_cross(
            Vec2f::new(0.0, -8.0),
            Vec2f::new(0.0, 8.0),
            Vec2f::new(-8.0, 0.0),
            Vec2f::new(8.0, 0.0),
        );
        assert_eq!(t, Some(0.5));

        // Parallel and out-of-range cases.
        assert!(segment_cross(
            Vec2f::new(0.0, 0.0),
            Vec2f::new(8.0, 0.0),
            Vec2f::new(0.0, 1.0),
            Vec2f::new(8.0, 1.0),
        )
        .is_none());
        assert!(segment_cross(
            Vec2f::new(0.0, 2.0),
            Vec2f::new(0.0, 8.0),
            Vec2f::new(-8.0, 0.0),
            Vec2f::new(8.0, 0.0),
        )
        .is_none());
    }

    #[test]
    fn test_point_in_subsector() {
        let map = two_sided_corridor();
        let trace = Trace::new(&map);
        assert_eq!(trace.point_in_subsector(Vec2f::new(32.0, 32.0)), Some(0));
        assert_eq!(trace.point_in_subsector(Vec2f::new(96.0, 32.0)), Some(1));

        let single = one_sided_square();
        let trace = Trace::new(&single);
        assert_eq!(trace.point_in_subsector(Vec2f::new(32.0, 32.0)), Some(0));
    }

    #[test]
    fn test_one_sided_wall_occludes() {
        let map = one_sided_square();
        let trace = Trace::new(&map);
        // Through the south wall.
        assert!(trace.occluded(
            Vec3f::new(32.0, 32.0, 64.0),
            Vec3f::new(32.0, -32.0, 64.0)
        ));
        // Fully inside.
        assert!(!trace.occluded(
            Vec3f::new(16.0, 16.0, 64.0),
            Vec3f::new(48.0, 48.0, 64.0)
        ));
    }

    #[test]
    fn test_two_sided_opening() {
        let map = two_sided_corridor();
        let trace = Trace::new(&map);
        // Through the opening (heights 32..96 are clear on both sides).
        assert!(!trace.occluded(
            Vec3f::new(32.0, 32.0, 64.0),
            Vec3f::new(96.0, 32.0, 64.0)
        ));
        // Crossing below the back sector's raised floor.
        assert!(trace.occluded(
            Vec3f::new(32.0, 32.0, 8.0),
            Vec3f::new(96.0, 32.0, 8.0)
        ));
        // Crossing above the back sector's lowered ceiling.
        assert!(trace.occluded(
            Vec3f::new(32.0, 32.0, 112.0),
            Vec3f::new(96.0, 32.0, 112.0)
        ));
    }
}
