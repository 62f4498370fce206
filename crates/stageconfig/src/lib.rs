//! Stage configuration loaded from TOML.
//!
//! The config file mirrors the options the site exposed: a palette plus
//! scalar knobs for the flow field, tunnel tuning values, and the virtual
//! document length the scroll controller normalizes against. Every option
//! has a default so an empty file (or no file at all) yields a runnable
//! stage.
//!
//! Color values arrive as hex strings. A malformed color is not an error:
//! it parses to black and therefore contributes nothing to the field, which
//! degrades the visuals instead of refusing to start.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// An RGB triple in `[0, 1]` channel range.
pub type Rgb = [f32; 3];

/// The zero contribution used for colors that fail to parse.
pub const BLACK: Rgb = [0.0, 0.0, 0.0];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StageConfig {
    #[serde(default)]
    pub stage: StageSection,
    #[serde(default)]
    pub field: FieldSection,
    #[serde(default)]
    pub tunnel: TunnelSection,
}

/// Virtual document the scroll offset is normalized against.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageSection {
    /// Scrollable length in viewport heights.
    #[serde(default = "default_pages")]
    pub pages: u32,
}

impl Default for StageSection {
    fn default() -> Self {
        Self {
            pages: default_pages(),
        }
    }
}

/// Flow-field options (the palette and scalar knobs from the site config).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldSection {
    /// Palette as hex strings (`#rrggbb` or `#rgb`). Entries beyond the
    /// renderer's color cap are ignored downstream, not rejected here.
    #[serde(default = "default_colors")]
    pub colors: Vec<String>,
    /// Time multiplier for field animation.
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Zoom factor for the field's apparent depth.
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Spatial frequency of the warp pattern.
    #[serde(default = "default_frequency")]
    pub frequency: f32,
    /// Reserved intensity multiplier for the coordinate warp.
    #[serde(default = "default_warp_strength")]
    pub warp_strength: f32,
    /// Weight of pointer position on the local field distortion.
    #[serde(default = "default_mouse_influence")]
    pub mouse_influence: f32,
    /// Weight of pointer position on the camera-like offset.
    #[serde(default = "default_parallax")]
    pub parallax: f32,
    /// Amount of anti-banding dither added to the output color.
    #[serde(default = "default_noise")]
    pub noise: f32,
    /// Base rotation angle in radians.
    #[serde(default)]
    pub rotation: f32,
    /// Continuous rotation rate in radians per second.
    #[serde(default = "default_auto_rotate")]
    pub auto_rotate: f32,
    /// When true, output alpha follows blob coverage instead of being
    /// forced opaque.
    #[serde(default)]
    pub transparent: bool,
}

impl Default for FieldSection {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            speed: default_speed(),
            scale: default_scale(),
            frequency: default_frequency(),
            warp_strength: default_warp_strength(),
            mouse_influence: default_mouse_influence(),
            parallax: default_parallax(),
            noise: default_noise(),
            rotation: 0.0,
            auto_rotate: default_auto_rotate(),
            transparent: false,
        }
    }
}

impl FieldSection {
    /// Palette parsed into RGB triples; malformed entries become black.
    pub fn palette(&self) -> Vec<Rgb> {
        self.colors.iter().map(|raw| parse_color(raw)).collect()
    }
}

/// Tunnel tuning values.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TunnelSection {
    /// Horizontal texture repeat at galaxy progress 0 (wide tiling).
    #[serde(default = "default_repeat_start")]
    pub repeat_start: f32,
    /// Horizontal texture repeat at galaxy progress 1 (hyperdrive streaks).
    #[serde(default = "default_repeat_end")]
    pub repeat_end: f32,
    /// Vertical texture offset advance per second, independent of progress.
    #[serde(default = "default_flow_speed")]
    pub flow_speed: f32,
    /// Camera jitter amplitude at galaxy progress 1.
    #[serde(default = "default_jitter")]
    pub jitter: f32,
    /// Seed for the star field and shard scatter.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for TunnelSection {
    fn default() -> Self {
        Self {
            repeat_start: default_repeat_start(),
            repeat_end: default_repeat_end(),
            flow_speed: default_flow_speed(),
            jitter: default_jitter(),
            seed: default_seed(),
        }
    }
}

fn default_pages() -> u32 {
    5
}

fn default_colors() -> Vec<String> {
    vec![
        "#0b1026".to_string(),
        "#1b2a4a".to_string(),
        "#4f2d7f".to_string(),
        "#8a4fff".to_string(),
        "#00c2ff".to_string(),
    ]
}

fn default_speed() -> f32 {
    1.0
}

fn default_scale() -> f32 {
    1.0
}

fn default_frequency() -> f32 {
    3.0
}

fn default_warp_strength() -> f32 {
    1.0
}

fn default_mouse_influence() -> f32 {
    0.5
}

fn default_parallax() -> f32 {
    0.25
}

fn default_noise() -> f32 {
    0.04
}

fn default_auto_rotate() -> f32 {
    0.05
}

fn default_repeat_start() -> f32 {
    10.0
}

fn default_repeat_end() -> f32 {
    0.3
}

fn default_flow_speed() -> f32 {
    0.25
}

fn default_jitter() -> f32 {
    0.02
}

fn default_seed() -> u64 {
    7
}

impl StageConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: StageConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage.pages == 0 {
            return Err(ConfigError::Invalid(
                "stage.pages must be at least 1".into(),
            ));
        }

        let field = &self.field;
        for (name, value) in [
            ("field.speed", field.speed),
            ("field.scale", field.scale),
            ("field.frequency", field.frequency),
            ("field.warp_strength", field.warp_strength),
            ("field.mouse_influence", field.mouse_influence),
            ("field.parallax", field.parallax),
            ("field.noise", field.noise),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative finite number, got {value}"
                )));
            }
        }
        if !field.rotation.is_finite() || !field.auto_rotate.is_finite() {
            return Err(ConfigError::Invalid(
                "field.rotation and field.auto_rotate must be finite".into(),
            ));
        }

        let tunnel = &self.tunnel;
        for (name, value) in [
            ("tunnel.repeat_start", tunnel.repeat_start),
            ("tunnel.repeat_end", tunnel.repeat_end),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        if !tunnel.flow_speed.is_finite() || tunnel.flow_speed < 0.0 {
            return Err(ConfigError::Invalid(
                "tunnel.flow_speed must be non-negative".into(),
            ));
        }
        if !tunnel.jitter.is_finite() || tunnel.jitter < 0.0 {
            return Err(ConfigError::Invalid(
                "tunnel.jitter must be non-negative".into(),
            ));
        }

        Ok(())
    }
}

/// Parses `#rrggbb` or `#rgb` (leading `#` optional) into an RGB triple.
///
/// Anything unparseable yields [`BLACK`], a zero contribution, rather than
/// an error.
pub fn parse_color(raw: &str) -> Rgb {
    let hex = raw.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return BLACK;
    }
    let expanded: String;
    let digits = match hex.len() {
        6 => hex,
        3 => {
            expanded = hex
                .chars()
                .flat_map(|c| [c, c])
                .collect();
            &expanded
        }
        _ => return BLACK,
    };
    let mut channels = [0.0_f32; 3];
    for (slot, chunk) in channels.iter_mut().zip(0..3_usize) {
        let byte = match u8::from_str_radix(&digits[chunk * 2..chunk * 2 + 2], 16) {
            Ok(byte) => byte,
            Err(_) => return BLACK,
        };
        *slot = byte as f32 / 255.0;
    }
    channels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_defaults() {
        let config = StageConfig::from_toml_str("").unwrap();
        assert_eq!(config.stage.pages, 5);
        assert_eq!(config.field.colors.len(), 5);
        assert_eq!(config.field.speed, 1.0);
        assert_eq!(config.tunnel.repeat_start, 10.0);
        assert_eq!(config.tunnel.repeat_end, 0.3);
    }

    #[test]
    fn parses_full_config() {
        let config = StageConfig::from_toml_str(
            r##"
[stage]
pages = 8

[field]
colors = ["#ff0000", "#00ff00"]
speed = 2.0
frequency = 4.5
transparent = true

[tunnel]
repeat_start = 12.0
flow_speed = 0.5
seed = 42
"##,
        )
        .unwrap();
        assert_eq!(config.stage.pages, 8);
        assert_eq!(config.field.colors.len(), 2);
        assert!(config.field.transparent);
        assert_eq!(config.field.frequency, 4.5);
        assert_eq!(config.tunnel.seed, 42);
        // Unset options keep their defaults.
        assert_eq!(config.tunnel.repeat_end, 0.3);
    }

    #[test]
    fn palette_parses_hex_colors() {
        let mut field = FieldSection::default();
        field.colors = vec!["#ff8000".into(), "0080ff".into(), "#abc".into()];
        let palette = field.palette();
        assert!((palette[0][0] - 1.0).abs() < 1e-6);
        assert!((palette[0][1] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(palette[0][2], 0.0);
        assert!((palette[1][2] - 1.0).abs() < 1e-6);
        // #abc expands to #aabbcc.
        assert!((palette[2][0] - 170.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn malformed_colors_become_black() {
        assert_eq!(parse_color("not-a-color"), BLACK);
        assert_eq!(parse_color("#12"), BLACK);
        assert_eq!(parse_color("#gggggg"), BLACK);
        assert_eq!(parse_color(""), BLACK);
        assert_eq!(parse_color("#ff00é"), BLACK);
    }

    #[test]
    fn oversized_palettes_are_preserved_for_downstream_capping() {
        let mut field = FieldSection::default();
        field.colors = (0..12).map(|_| "#ffffff".to_string()).collect();
        assert_eq!(field.palette().len(), 12);
    }

    #[test]
    fn rejects_invalid_values() {
        let zero_pages = StageConfig::from_toml_str("[stage]\npages = 0\n");
        assert!(matches!(zero_pages, Err(ConfigError::Invalid(_))));

        let negative_speed = StageConfig::from_toml_str("[field]\nspeed = -1.0\n");
        assert!(matches!(negative_speed, Err(ConfigError::Invalid(_))));

        let zero_repeat = StageConfig::from_toml_str("[tunnel]\nrepeat_end = 0.0\n");
        assert!(matches!(zero_repeat, Err(ConfigError::Invalid(_))));
    }
}
