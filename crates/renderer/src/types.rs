/// The flow field blends at most eight color layers per fragment.
pub const MAX_COLORS: usize = 8;

/// An RGB triple in `[0, 1]` channel range.
pub type Rgb = [f32; 3];

/// Anti-aliasing policy for the render pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Default for Antialiasing {
    fn default() -> Self {
        Self::Auto
    }
}

/// Output color handling for the render surface.
///
/// The tunnel's star texture and the swapchain must agree on one
/// linear-light interpretation, otherwise the galaxy washes out; `Auto`
/// therefore resolves to `Linear`. `Gamma` remains available for hosts that
/// composite against gamma-encoded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    #[default]
    Auto,
    /// Non-sRGB swapchain; shader outputs are treated as gamma-encoded.
    Gamma,
    /// sRGB swapchain and textures; blending happens in linear light.
    Linear,
}

/// Declares how the compositor should treat the swapchain alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAlpha {
    /// Alpha is forced to 1; frames fully cover the surface.
    Opaque,
    /// Alpha follows blob coverage so the host may blend behind the field.
    Coverage,
}

impl Default for SurfaceAlpha {
    fn default() -> Self {
        Self::Opaque
    }
}

/// Immutable flow-field configuration captured at mount.
#[derive(Debug, Clone)]
pub struct FieldConfig {
    /// Palette; entries beyond [`MAX_COLORS`] are ignored.
    pub colors: Vec<Rgb>,
    /// Time multiplier for field animation.
    pub speed: f32,
    /// Zoom factor for the field's apparent depth.
    pub scale: f32,
    /// Spatial frequency of the warp pattern.
    pub frequency: f32,
    /// Reserved intensity multiplier for the coordinate warp.
    pub warp_strength: f32,
    /// Weight of pointer position on the local field distortion.
    pub mouse_influence: f32,
    /// Weight of pointer position on the camera-like offset.
    pub parallax: f32,
    /// Amount of anti-banding dither added to the output color.
    pub noise: f32,
    /// Base rotation angle in radians.
    pub rotation: f32,
    /// Continuous rotation rate in radians per second.
    pub auto_rotate: f32,
    /// Alpha behaviour of the surface.
    pub surface_alpha: SurfaceAlpha,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Desired color handling for the swapchain.
    pub color_space: ColorSpaceMode,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            colors: vec![
                [0.043, 0.063, 0.149],
                [0.106, 0.165, 0.290],
                [0.310, 0.176, 0.498],
                [0.541, 0.310, 1.0],
                [0.0, 0.761, 1.0],
            ],
            speed: 1.0,
            scale: 1.0,
            frequency: 3.0,
            warp_strength: 1.0,
            mouse_influence: 0.5,
            parallax: 0.25,
            noise: 0.04,
            rotation: 0.0,
            auto_rotate: 0.05,
            surface_alpha: SurfaceAlpha::Opaque,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
        }
    }
}

/// Immutable tunnel configuration captured at mount.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    /// Horizontal texture repeat at galaxy progress 0.
    pub repeat_start: f32,
    /// Horizontal texture repeat at galaxy progress 1.
    pub repeat_end: f32,
    /// Vertical texture offset advance per second, independent of progress.
    pub flow_speed: f32,
    /// Camera jitter amplitude at galaxy progress 1.
    pub jitter: f32,
    /// Seed for the star field and shard scatter.
    pub seed: u64,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Desired color handling for the swapchain.
    pub color_space: ColorSpaceMode,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            repeat_start: 10.0,
            repeat_end: 0.3,
            flow_speed: 0.25,
            jitter: 0.02,
            seed: 7,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
        }
    }
}
