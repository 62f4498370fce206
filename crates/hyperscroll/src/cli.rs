use std::path::PathBuf;

use clap::Parser;
use renderer::{Antialiasing, ColorSpaceMode};

/// Which engine windows the stage should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSelection {
    Field,
    Tunnel,
    Both,
}

impl std::fmt::Display for StageSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageSelection::Field => f.write_str("field"),
            StageSelection::Tunnel => f.write_str("tunnel"),
            StageSelection::Both => f.write_str("both"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "hyperscroll",
    author,
    version,
    about = "Scroll-synchronized procedural visual stage",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Path to a stage configuration TOML file; defaults apply without one.
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Which stage window(s) to open: `field`, `tunnel`, or `both`.
    #[arg(long, value_parser = parse_stage, default_value_t = StageSelection::Both)]
    pub stage: StageSelection,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub window_size: Option<String>,

    /// Virtual document length in viewport heights; overrides the config.
    #[arg(long, value_name = "N")]
    pub pages: Option<u32>,

    /// Optional FPS cap (0 = uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_antialias,
        default_value = "auto"
    )]
    pub antialias: Antialiasing,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_color_space,
        default_value = "auto"
    )]
    pub color_space: ColorSpaceMode,

    /// Freeze scroll progress at a fixed value in [0, 1] (debugging).
    #[arg(long, value_name = "PROGRESS")]
    pub progress: Option<f32>,

    /// Freeze shader time at a fixed timestamp in seconds (debugging).
    #[arg(long, value_name = "SECONDS")]
    pub still_time: Option<f32>,

    /// Let the field's alpha follow blob coverage instead of forcing opaque.
    #[arg(long)]
    pub transparent: bool,

    /// Print the merged configuration as TOML and exit without rendering.
    #[arg(long)]
    pub dump_config: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_stage(raw: &str) -> Result<StageSelection, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "field" => Ok(StageSelection::Field),
        "tunnel" => Ok(StageSelection::Tunnel),
        "both" | "all" => Ok(StageSelection::Both),
        other => Err(format!(
            "invalid stage '{other}' (expected field, tunnel, or both)"
        )),
    }
}

fn parse_antialias(raw: &str) -> Result<Antialiasing, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "0" | "1" => Ok(Antialiasing::Off),
        other => other
            .parse::<u32>()
            .map(Antialiasing::Samples)
            .map_err(|_| format!("invalid antialias setting '{other}'")),
    }
}

fn parse_color_space(raw: &str) -> Result<ColorSpaceMode, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" => Ok(ColorSpaceMode::Gamma),
        "linear" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "invalid color space '{other}' (expected auto, gamma, or linear)"
        )),
    }
}

/// Parses `WIDTHxHEIGHT` into a pixel size.
pub fn parse_window_size(raw: &str) -> Result<(u32, u32), String> {
    let (width, height) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{raw}' (expected WIDTHxHEIGHT)"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{raw}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{raw}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size '{raw}' must be non-zero"));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_values_parse() {
        assert_eq!(parse_stage("field").unwrap(), StageSelection::Field);
        assert_eq!(parse_stage("Both").unwrap(), StageSelection::Both);
        assert!(parse_stage("galaxy").is_err());
    }

    #[test]
    fn antialias_values_parse() {
        assert_eq!(parse_antialias("auto").unwrap(), Antialiasing::Auto);
        assert_eq!(parse_antialias("off").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("4").unwrap(), Antialiasing::Samples(4));
        assert!(parse_antialias("fancy").is_err());
    }

    #[test]
    fn window_size_parses() {
        assert_eq!(parse_window_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_window_size("640X480").unwrap(), (640, 480));
        assert!(parse_window_size("1280").is_err());
        assert!(parse_window_size("0x720").is_err());
    }

    #[test]
    fn cli_defaults_open_both_stages() {
        let cli = Cli::parse_from(["hyperscroll"]);
        assert_eq!(cli.stage, StageSelection::Both);
        assert!(cli.config.is_none());
        assert!(!cli.dump_config);
    }
}
