use bytemuck::{Pod, Zeroable};

use crate::types::{FieldConfig, Rgb, SurfaceAlpha, MAX_COLORS};

/// CPU-side mirror of the flow-field uniform block.
///
/// The layout matches the `FieldParams` block in `compile.rs` and must
/// observe std140 alignment; every member is vec4-sized, so there is no
/// hidden padding to get wrong. The fourth resolution component mirrors the
/// time value so the shader always has an animating scalar at hand.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct FieldUniforms {
    /// width, height, aspect, time mirror
    pub resolution: [f32; 4],
    /// pointer x/y in [-1, 1]
    pub pointer: [f32; 4],
    /// time, rotation angle, scroll depth, flash mix
    pub motion: [f32; 4],
    /// scale, frequency, warp strength, noise amount
    pub shape: [f32; 4],
    /// mouse influence, parallax, active color count, coverage alpha
    pub style: [f32; 4],
    pub colors: [[f32; 4]; MAX_COLORS],
}

unsafe impl Zeroable for FieldUniforms {}
unsafe impl Pod for FieldUniforms {}

impl FieldUniforms {
    pub fn new(width: u32, height: u32, config: &FieldConfig) -> Self {
        let coverage_alpha = match config.surface_alpha {
            SurfaceAlpha::Opaque => 0.0,
            SurfaceAlpha::Coverage => 1.0,
        };
        let mut uniforms = Self {
            resolution: [0.0; 4],
            pointer: [0.0; 4],
            motion: [0.0, config.rotation, 0.0, 0.0],
            shape: [
                config.scale,
                config.frequency,
                config.warp_strength,
                config.noise,
            ],
            style: [config.mouse_influence, config.parallax, 0.0, coverage_alpha],
            colors: [[0.0; 4]; MAX_COLORS],
        };
        uniforms.set_resolution(width as f32, height as f32);
        uniforms.set_colors(&config.colors);
        uniforms
    }

    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution[0] = width;
        self.resolution[1] = height;
        self.resolution[2] = if height > 0.0 { width / height } else { 1.0 };
    }

    pub fn aspect(&self) -> f32 {
        self.resolution[2]
    }

    /// Stores pointer coordinates clamped to the NDC square.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.pointer[0] = x.clamp(-1.0, 1.0);
        self.pointer[1] = y.clamp(-1.0, 1.0);
    }

    /// Copies up to [`MAX_COLORS`] entries and records the active count.
    ///
    /// Slots beyond the active count are zeroed so stale colors can never
    /// bleed into the accumulation loop; excess input entries are ignored.
    pub fn set_colors(&mut self, colors: &[Rgb]) {
        let active = colors.len().min(MAX_COLORS);
        for slot in 0..MAX_COLORS {
            self.colors[slot] = if slot < active {
                let [r, g, b] = colors[slot];
                [r, g, b, 1.0]
            } else {
                [0.0; 4]
            };
        }
        self.style[2] = active as f32;
    }

    pub fn active_color_count(&self) -> usize {
        self.style[2] as usize
    }

    pub fn set_motion(&mut self, time: f32, angle: f32) {
        self.motion[0] = time;
        self.motion[1] = angle;
        self.resolution[3] = time;
    }

    pub fn set_scroll_depth(&mut self, depth: f32) {
        self.motion[2] = depth;
    }

    pub fn set_flash(&mut self, flash: f32) {
        self.motion[3] = flash.clamp(0.0, 1.0);
    }
}

/// CPU-side mirror of the tunnel uniform block (`TunnelParams` in
/// `compile.rs`), shared by the tube and shard passes.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct TunnelUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// repeat x, v offset, flash mix, shatter progress
    pub scroll: [f32; 4],
}

unsafe impl Zeroable for TunnelUniforms {}
unsafe impl Pod for TunnelUniforms {}

impl TunnelUniforms {
    pub fn new() -> Self {
        Self {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            scroll: [1.0, 0.0, 0.0, 0.0],
        }
    }

    pub fn set_view_proj(&mut self, view_proj: glam::Mat4) {
        self.view_proj = view_proj.to_cols_array_2d();
    }

    pub fn set_scroll(&mut self, repeat_x: f32, v_offset: f32, flash: f32, shatter: f32) {
        self.scroll = [repeat_x, v_offset, flash.clamp(0.0, 1.0), shatter];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldConfig;

    fn uniforms() -> FieldUniforms {
        FieldUniforms::new(800, 600, &FieldConfig::default())
    }

    #[test]
    fn color_count_tracks_input_length() {
        let mut u = uniforms();
        for n in 0..=MAX_COLORS {
            let colors: Vec<Rgb> = (0..n).map(|i| [i as f32 / 8.0, 0.5, 1.0]).collect();
            u.set_colors(&colors);
            assert_eq!(u.active_color_count(), n);
        }
    }

    #[test]
    fn excess_colors_are_ignored_and_slots_zeroed() {
        let mut u = uniforms();
        let colors: Vec<Rgb> = (0..12).map(|_| [1.0, 1.0, 1.0]).collect();
        u.set_colors(&colors);
        assert_eq!(u.active_color_count(), MAX_COLORS);

        // Shrinking the palette must clear what the larger palette wrote.
        u.set_colors(&[[0.2, 0.4, 0.6]]);
        assert_eq!(u.active_color_count(), 1);
        assert_eq!(u.colors[0], [0.2, 0.4, 0.6, 1.0]);
        for slot in 1..MAX_COLORS {
            assert_eq!(u.colors[slot], [0.0; 4]);
        }
    }

    #[test]
    fn empty_palette_is_valid() {
        let mut u = uniforms();
        u.set_colors(&[]);
        assert_eq!(u.active_color_count(), 0);
    }

    #[test]
    fn square_surface_has_unit_aspect() {
        let mut u = uniforms();
        u.set_resolution(1920.0, 1080.0);
        assert!((u.aspect() - 16.0 / 9.0).abs() < 1e-6);
        u.set_resolution(512.0, 512.0);
        assert_eq!(u.aspect(), 1.0);
    }

    #[test]
    fn pointer_is_clamped_to_ndc() {
        let mut u = uniforms();
        u.set_pointer(3.0, -7.5);
        assert_eq!(u.pointer[0], 1.0);
        assert_eq!(u.pointer[1], -1.0);
        u.set_pointer(0.25, 0.75);
        assert_eq!(u.pointer[0], 0.25);
        assert_eq!(u.pointer[1], 0.75);
    }

    #[test]
    fn motion_mirrors_time_into_resolution() {
        let mut u = uniforms();
        u.set_motion(12.5, 0.3);
        assert_eq!(u.resolution[3], 12.5);
        assert_eq!(u.motion[0], 12.5);
    }
}
