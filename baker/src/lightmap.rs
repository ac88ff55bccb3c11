use crate::errors::{Result, ResultExt};
use crate::map::DoomMap;
use crate::surfaces::{LightmapInfo, Surface};
use crate::trace::Trace;
use log::info;
use math::{BBox3, Plane, Vec3f};
use num_traits::Zero;
use std::path::Path;
use wad::types::WadLight;
use wad::util::from_wad_coord;

/// Largest atlas texture edge the lump format is prepared to carry.
pub const LIGHTMAP_MAX_SIZE: usize = 1024;

#[derive(Copy, Clone, Debug)]
pub struct BakeConfig {
    pub texture_width: usize,
    pub texture_height: usize,
    /// World-unit quantum of the sampling grid; one texel covers this many
    /// map units along each basis direction.
    pub samples: usize,
    /// Base light level added to every texel before light contributions.
    pub ambience: f32,
}

impl Default for BakeConfig {
    fn default() -> Self {
        BakeConfig {
            texture_width: 128,
            texture_height: 128,
            samples: 16,
            ambience: 0.0,
        }
    }
}

/// Packs surfaces into atlas textures and shades their texel grids.
pub struct LightmapBuilder {
    texture_width: usize,
    texture_height: usize,
    samples: usize,
    ambience: f32,

    /// Per-column fill heights of the newest texture.
    alloc_blocks: Vec<usize>,
    /// Finished and in-progress atlas buffers, W*H*3 bytes each, stored in
    /// the reversed (BGR) channel order they are serialized with.
    textures: Vec<Vec<u8>>,
    traced_texels: usize,
}

impl LightmapBuilder {
    pub fn new(config: &BakeConfig) -> LightmapBuilder {
        LightmapBuilder {
            texture_width: config.texture_width,
            texture_height: config.texture_height,
            samples: config.samples.max(1),
            ambience: config.ambience,
            alloc_blocks: Vec::new(),
            textures: Vec::new(),
            traced_texels: 0,
        }
    }

    pub fn texture_width(&self) -> usize {
        self.texture_width
    }

    pub fn texture_height(&self) -> usize {
        self.texture_height
    }

    pub fn textures(&self) -> &[Vec<u8>] {
        &self.textures
    }

    /// Parameterizes and shades every surface, in arena order. Placement
    /// is sequential, so the same surface list always produces the same
    /// atlas layout.
    pub fn create_lightmaps(&mut self, map: &DoomMap, surfaces: &mut [Surface]) -> Result<()> {
        let trace = Trace::new(map);
        let lights: Vec<WadLight> = map
            .lights
            .iter()
            .filter(|light| light.is_active())
            .cloned()
            .collect();
        info!(
            "Creating lightmaps: {} surfaces, {} lights...",
            surfaces.len(),
            lights.len()
        );

        for surface in surfaces.iter_mut() {
            self.build_surface_params(surface)?;
            self.trace_surface(&trace, &lights, surface);
        }

        info!(
            "Traced {} texels into {} texture(s)",
            self.traced_texels,
            self.textures.len()
        );
        Ok(())
    }

    /// Starts a fresh atlas texture; all placements go to the newest one.
    fn new_texture(&mut self) {
        self.alloc_blocks.clear();
        self.alloc_blocks.resize(self.texture_width, 0);
        self.textures
            .push(vec![0u8; self.texture_width * self.texture_height * 3]);
    }

    /// First-fit shelf search over the current texture's columns. Scans
    /// every feasible starting column left to right; a candidate span wins
    /// when its maximum fill height beats the best found so far (ties keep
    /// the earlier column). Returns the placement origin, or None when the
    /// block cannot fit.
    fn make_room_for_block(&mut self, width: usize, height: usize) -> Option<(usize, usize)> {
        if self.alloc_blocks.is_empty() || width > self.texture_width {
            return None;
        }

        let mut best_row = self.texture_height;
        let mut placement = None;

        for start in 0..=(self.texture_width - width) {
            let mut span_max = 0;
            let mut scanned = 0;
            for column in start..start + width {
                if self.alloc_blocks[column] >= best_row {
                    break;
                }
                if self.alloc_blocks[column] > span_max {
                    span_max = self.alloc_blocks[column];
                }
                scanned += 1;
            }
            if scanned == width {
                placement = Some((start, span_max));
                best_row = span_max;
            }
        }

        let (x, y) = placement?;
        if y + height > self.texture_height {
            return None;
        }
        for column in &mut self.alloc_blocks[x..x + width] {
            *column = y + height;
        }
        Some((x, y))
    }

    /// Computes a surface's texel grid, atlas placement, UV table and
    /// world-space sampling basis.
    pub fn build_surface_params(&mut self, surface: &mut Surface) -> Result<()> {
        let plane = surface.plane;
        let samples = self.samples as f32;

        let axis = plane.dominant_axis();
        let normal_component = plane.normal[axis];
        if normal_component == 0.0 {
            return Err(format!(
                "surface {} has a degenerate plane normal",
                surface.type_index
            )
            .into());
        }

        // Round the bounding box out to the sampling grid.
        let mut bounds = BBox3::from_points(&surface.verts);
        let mut rounded_size = [0usize; 3];
        for i in 0..3 {
            bounds.min[i] = samples * (bounds.min[i] / samples).floor();
            bounds.max[i] = samples * (bounds.max[i] / samples).ceil();
            rounded_size[i] = ((bounds.max[i] - bounds.min[i]) / samples) as usize + 1;
        }

        let (width_axis, height_axis) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let mut width = rounded_size[width_axis];
        let mut height = rounded_size[height_axis];

        let mut basis = [Vec3f::zero(), Vec3f::zero()];
        basis[0][width_axis] = 1.0 / samples;
        basis[1][height_axis] = 1.0 / samples;

        // Oversized surfaces keep their full extent at reduced resolution.
        let mut step_scale = [samples, samples];
        if width > self.texture_width {
            let scale = self.texture_width as f32 / width as f32;
            basis[0] = basis[0] * scale;
            step_scale[0] /= scale;
            width = self.texture_width;
        }
        if height > self.texture_height {
            let scale = self.texture_height as f32 / height as f32;
            basis[1] = basis[1] * scale;
            step_scale[1] /= scale;
            height = self.texture_height;
        }

        let (x, y) = match self.make_room_for_block(width, height) {
            Some(placement) => placement,
            None => {
                self.new_texture();
                self.make_room_for_block(width, height).ok_or_else(|| {
                    format!(
                        "lightmap allocation failed for a {}x{} block on an empty {}x{} texture",
                        width, height, self.texture_width, self.texture_height
                    )
                })?
            }
        };

        let mut coords = Vec::with_capacity(surface.verts.len() * 2);
        for vert in &surface.verts {
            let delta = *vert - bounds.min;
            coords.push((delta.dot(&basis[0]) + x as f32 + 0.5) / self.texture_width as f32);
            coords.push((delta.dot(&basis[1]) + y as f32 + 0.5) / self.texture_height as f32);
        }

        // Project the sampling origin and steps onto the surface plane
        // along the dominant axis, so texel positions never leave it.
        let mut origin = bounds.min;
        origin[axis] -= plane.point_delta(origin) / normal_component;

        let mut steps = [Vec3f::zero(), Vec3f::zero()];
        for (step, (&base, &scale)) in steps
            .iter_mut()
            .zip(basis.iter().zip(step_scale.iter()))
        {
            let mut out = base.normalized() * scale;
            out[axis] -= plane.distance(out) / normal_component;
            *step = out;
        }

        surface.lightmap = LightmapInfo {
            texture: self.textures.len() - 1,
            offs: [x, y],
            dims: [width, height],
            origin,
            steps,
            coords,
        };
        Ok(())
    }

    /// Shades one surface's texel grid into its atlas rectangle.
    pub fn trace_surface(&mut self, trace: &Trace, lights: &[WadLight], surface: &Surface) {
        let LightmapInfo {
            texture,
            offs,
            dims,
            origin,
            steps,
            ..
        } = surface.lightmap.clone();
        let normal = surface.plane.normal;
        let (texture_width, ambience) = (self.texture_width, self.ambience);

        let buffer = &mut self.textures[texture];
        for i in 0..dims[0] {
            for j in 0..dims[1] {
                let pos = origin + normal + steps[0] * i as f32 + steps[1] * j as f32;
                let color = light_texel_sample(trace, lights, ambience, pos, &surface.plane);

                let offset = ((offs[1] + j) * texture_width + offs[0] + i) * 3;
                buffer[offset] = (color[2] * 255.0) as u8;
                buffer[offset + 1] = (color[1] * 255.0) as u8;
                buffer[offset + 2] = (color[0] * 255.0) as u8;
            }
        }
        self.traced_texels += dims[0] * dims[1];
    }

    /// Dumps every atlas texture as an uncompressed truecolor image for
    /// inspection.
    pub fn write_textures(&self, directory: &Path) -> Result<()> {
        for (index, texture) in self.textures.iter().enumerate() {
            let mut rgb = Vec::with_capacity(texture.len());
            for pixel in texture.chunks(3) {
                rgb.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
            }
            let path = directory.join(format!("lightmap_{:02}.tga", index));
            image::save_buffer(
                &path,
                &rgb,
                self.texture_width as u32,
                self.texture_height as u32,
                image::ColorType::Rgb8,
            )
            .err_context(|_| format!("writing lightmap image {:?}", path))?;
            info!("Wrote {:?}", path);
        }
        Ok(())
    }
}

/// Total incident light at one texel: ambience plus every visible light's
/// attenuated, Lambert-weighted contribution, clamped per channel.
fn light_texel_sample(
    trace: &Trace,
    lights: &[WadLight],
    ambience: f32,
    origin: Vec3f,
    plane: &Plane,
) -> Vec3f {
    let mut color = Vec3f::new(ambience, ambience, ambience);

    for light in lights {
        let light_pos = Vec3f::new(
            from_wad_coord(light.x),
            from_wad_coord(light.y),
            from_wad_coord(light.z),
        );
        if plane.point_delta(light_pos) < 0.0 {
            continue;
        }

        let delta = light_pos - origin;
        let distance_sq = delta.squared_norm();
        if distance_sq == 0.0 {
            continue;
        }
        if trace.occluded(origin, light_pos) {
            continue;
        }

        let direction = delta / distance_sq.sqrt();
        let attenuation =
            f32::from(light.intensity) * f32::from(light.radius) / distance_sq;
        let lambert = plane.normal.dot(&direction).max(0.0);
        let weight = Vec3f::new(
            f32::from(light.rgb[0]) / 255.0,
            f32::from(light.rgb[1]) / 255.0,
            f32::from(light.rgb[2]) / 255.0,
        );
        color += weight * (attenuation * lambert);
    }

    for channel in 0..3 {
        color[channel] = color[channel].min(1.0).max(0.0);
    }
    color
}

#[cfg(test)]
mod test {
    use super::{light_texel_sample, BakeConfig, LightmapBuilder};
    use crate::map::test_fixtures::{light, one_sided_square, two_sided_corridor};
    use crate::surfaces::build_surfaces;
    use crate::trace::Trace;
    use math::{Plane, Vec3f};

    const EPSILON: f32 = 1e-3;

    fn builder() -> LightmapBuilder {
        LightmapBuilder::new(&BakeConfig::default())
    }

    #[test]
    fn test_shelf_packing_first_fit() {
        let mut builder = builder();
        builder.new_texture();
        assert_eq!(builder.make_room_for_block(8, 8), Some((0, 0)));
        assert_eq!(builder.make_room_for_block(8, 8), Some((8, 0)));
        assert_eq!(builder.make_room_for_block(128, 8), Some((0, 8)));
    }

    #[test]
    fn test_shelf_packing_bounds() {
        let mut builder = builder();
        assert_eq!(builder.make_room_for_block(8, 8), None);

        builder.new_texture();
        assert_eq!(builder.make_room_for_block(256, 8), None);
        assert_eq!(builder.make_room_for_block(128, 128), Some((0, 0)));
        // The texture is now full to the brim.
        assert_eq!(builder.make_room_for_block(1, 1), None);
    }

    #[test]
    fn test_shelf_heights_update() {
        let mut builder = builder();
        builder.new_texture();
        builder.make_room_for_block(16, 32).unwrap();
        // Placing over the same columns stacks above the first block.
        assert_eq!(builder.make_room_for_block(128, 4), Some((0, 32)));
    }

    #[test]
    fn test_params_uv_in_unit_range() {
        let map = two_sided_corridor();
        let mut surfaces = build_surfaces(&map).unwrap();
        let mut builder = builder();
        for surface in &mut surfaces {
            builder.build_surface_params(surface).unwrap();
            for &coord in &surface.lightmap.coords {
                assert!((0.0..=1.0).contains(&coord), "uv {} out of range", coord);
            }
        }
    }

    #[test]
    fn test_params_texels_on_plane() {
        let map = two_sided_corridor();
        let mut surfaces = build_surfaces(&map).unwrap();
        let mut builder = builder();
        for surface in &mut surfaces {
            builder.build_surface_params(surface).unwrap();
            let lm = &surface.lightmap;
            for i in 0..lm.dims[0] {
                for j in 0..lm.dims[1] {
                    let pos = lm.origin + lm.steps[0] * i as f32 + lm.steps[1] * j as f32;
                    assert!(
                        surface.plane.point_delta(pos).abs() < EPSILON,
                        "texel ({}, {}) off plane: {:?}",
                        i,
                        j,
                        pos
                    );
                }
            }
        }
    }

    #[test]
    fn test_params_deterministic() {
        let map = two_sided_corridor();
        let mut first = build_surfaces(&map).unwrap();
        let mut second = build_surfaces(&map).unwrap();

        let mut builder_a = builder();
        let mut builder_b = builder();
        for (a, b) in first.iter_mut().zip(second.iter_mut()) {
            builder_a.build_surface_params(a).unwrap();
            builder_b.build_surface_params(b).unwrap();
            assert_eq!(a.lightmap.texture, b.lightmap.texture);
            assert_eq!(a.lightmap.offs, b.lightmap.offs);
            assert_eq!(a.lightmap.dims, b.lightmap.dims);
            assert_eq!(a.lightmap.coords, b.lightmap.coords);
        }
    }

    #[test]
    fn test_params_no_overlap() {
        let map = two_sided_corridor();
        let mut surfaces = build_surfaces(&map).unwrap();
        let mut builder = builder();
        for surface in &mut surfaces {
            builder.build_surface_params(surface).unwrap();
        }
        for (i, a) in surfaces.iter().enumerate() {
            for b in &surfaces[i + 1..] {
                if a.lightmap.texture != b.lightmap.texture {
                    continue;
                }
                let separated = (0..2).any(|axis| {
                    a.lightmap.offs[axis] + a.lightmap.dims[axis] <= b.lightmap.offs[axis]
                        || b.lightmap.offs[axis] + b.lightmap.dims[axis] <= a.lightmap.offs[axis]
                });
                assert!(separated, "overlapping placements");
            }
        }
    }

    #[test]
    fn test_params_clamp_oversized() {
        // A 4096-unit wall wants 257 texels, which a 128-wide texture
        // cannot hold; the basis scales down instead of failing.
        let mut builder = builder();
        let mut surfaces = {
            let mut map = one_sided_square();
            map.vertices[1] = crate::map::test_fixtures::vertex(4096, 0);
            build_surfaces(&map).unwrap()
        };
        let wall = &mut surfaces[0];
        builder.build_surface_params(wall).unwrap();
        assert_eq!(wall.lightmap.dims[0], 128);
        // The world step grows by the same factor the basis shrank.
        assert!(wall.lightmap.steps[0].norm() > 16.0);
        // The half-texel center offset may nudge the far edge a hair past
        // 1.0 on clamped surfaces.
        for &coord in &wall.lightmap.coords {
            assert!(coord >= 0.0 && coord <= 1.0 + 1e-3);
        }
    }

    #[test]
    fn test_light_on_plane_contributes_nothing() {
        let map = one_sided_square();
        let trace = Trace::new(&map);
        // Floor plane through z = 0; the light sits exactly on it.
        let plane = Plane::from_point(Vec3f::new(0.0, 0.0, 1.0), Vec3f::new(0.0, 0.0, 0.0));
        let lights = [light(32, 32, 0, 64, 255, [255, 255, 255])];

        let color = light_texel_sample(
            &trace,
            &lights,
            0.0,
            Vec3f::new(16.0, 16.0, 1.0),
            &plane,
        );
        assert_eq!(color, Vec3f::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_light_behind_plane_is_skipped() {
        let map = one_sided_square();
        let trace = Trace::new(&map);
        let plane = Plane::from_point(Vec3f::new(0.0, 0.0, 1.0), Vec3f::new(0.0, 0.0, 0.0));
        let below = [light(32, 32, -16, 64, 255, [255, 255, 255])];
        let above = [light(32, 32, 48, 64, 255, [255, 255, 255])];

        let origin = Vec3f::new(32.0, 32.0, 1.0);
        assert_eq!(
            light_texel_sample(&trace, &below, 0.0, origin, &plane),
            Vec3f::new(0.0, 0.0, 0.0)
        );
        let lit = light_texel_sample(&trace, &above, 0.0, origin, &plane);
        assert!(lit[0] > 0.0 && lit[1] > 0.0 && lit[2] > 0.0);
    }

    #[test]
    fn test_create_lightmaps_end_to_end() {
        let mut map = two_sided_corridor();
        map.lights = vec![light(32, 32, 64, 80, 200, [255, 128, 64])];
        let mut surfaces = build_surfaces(&map).unwrap();

        let mut builder = builder();
        builder.create_lightmaps(&map, &mut surfaces).unwrap();
        assert!(!builder.textures().is_empty());

        // The left sector's floor sees the light from straight above its
        // center; that texel cannot be black.
        let floor = surfaces
            .iter()
            .find(|s| {
                s.kind == crate::surfaces::SurfaceKind::Floor
                    && s.type_index == 0
            })
            .unwrap();
        let lm = &floor.lightmap;
        let buffer = &builder.textures()[lm.texture];
        let mut any_lit = false;
        for j in 0..lm.dims[1] {
            for i in 0..lm.dims[0] {
                let offset = ((lm.offs[1] + j) * builder.texture_width() + lm.offs[0] + i) * 3;
                if buffer[offset..offset + 3].iter().any(|&b| b > 0) {
                    any_lit = true;
                }
            }
        }
        assert!(any_lit);
    }
}
