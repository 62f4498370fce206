use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use tracing_subscriber::EnvFilter;
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use lifecycle::ScopeCounters;
use renderer::{
    time_source_for_policy, FieldConfig, FieldRenderer, FramePacer, RenderPolicy, SurfaceAlpha,
    TunnelConfig, TunnelEngine,
};
use scrollphase::{PhaseSample, PhaseSink, ScrollPhaseController, SinkId};
use stageconfig::StageConfig;

use crate::cli::{parse_window_size, Cli, StageSelection};
use crate::host::HostCapabilities;
use crate::scroll::VirtualDocument;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Everything the event loop needs, merged from config file and CLI.
pub struct StageOptions {
    pub window_size: (u32, u32),
    pub pages: u32,
    pub target_fps: Option<f32>,
    pub policy: RenderPolicy,
    pub frozen_progress: Option<f32>,
    pub field: FieldConfig,
    pub tunnel: TunnelConfig,
}

/// Merges the TOML config with CLI overrides; CLI wins where both speak.
pub fn merge_options(cli: &Cli, config: &StageConfig) -> Result<StageOptions> {
    let window_size = cli
        .window_size
        .as_deref()
        .map(|raw| parse_window_size(raw).map_err(|err| anyhow!(err)))
        .transpose()?
        .unwrap_or((1280, 720));

    let pages = cli.pages.unwrap_or(config.stage.pages).max(1);

    if let Some(progress) = cli.progress {
        if !(0.0..=1.0).contains(&progress) {
            anyhow::bail!("--progress must lie in [0, 1], got {progress}");
        }
    }

    let target_fps = cli.fps.filter(|fps| *fps > 0.0);
    let policy = match cli.still_time {
        Some(time) => RenderPolicy::Still {
            time,
            progress: cli.progress.unwrap_or(0.0),
        },
        None => RenderPolicy::Animate { target_fps },
    };

    let field = FieldConfig {
        colors: config.field.palette(),
        speed: config.field.speed,
        scale: config.field.scale,
        frequency: config.field.frequency,
        warp_strength: config.field.warp_strength,
        mouse_influence: config.field.mouse_influence,
        parallax: config.field.parallax,
        noise: config.field.noise,
        rotation: config.field.rotation,
        auto_rotate: config.field.auto_rotate,
        surface_alpha: if cli.transparent || config.field.transparent {
            SurfaceAlpha::Coverage
        } else {
            SurfaceAlpha::Opaque
        },
        antialiasing: cli.antialias,
        color_space: cli.color_space,
    };

    let tunnel = TunnelConfig {
        repeat_start: config.tunnel.repeat_start,
        repeat_end: config.tunnel.repeat_end,
        flow_speed: config.tunnel.flow_speed,
        jitter: config.tunnel.jitter,
        seed: config.tunnel.seed,
        antialiasing: cli.antialias,
        color_space: cli.color_space,
    };

    Ok(StageOptions {
        window_size,
        pages,
        target_fps,
        policy,
        frozen_progress: cli.progress,
        field,
        tunnel,
    })
}

pub fn run(cli: Cli) -> Result<()> {
    let config = match cli.config.as_deref() {
        Some(path) => StageConfig::load(path)
            .with_context(|| format!("failed to load stage config from {}", path.display()))?,
        None => StageConfig::default(),
    };

    if cli.dump_config {
        let mut merged = config.clone();
        if let Some(pages) = cli.pages {
            merged.stage.pages = pages;
        }
        if cli.transparent {
            merged.field.transparent = true;
        }
        print!("{}", toml::to_string_pretty(&merged)?);
        return Ok(());
    }

    let options = merge_options(&cli, &config)?;

    // The standalone stage runs against inert host capabilities; an
    // embedding site injects live session/payment implementations here.
    let host = HostCapabilities::detached();
    match host.session.current_user() {
        Some(user) => tracing::info!(user = %user.display_name, "session active"),
        None => tracing::debug!("no active session; stage runs detached"),
    }
    if !host.sdk.is_ready() {
        tracing::debug!("payment SDK not yet available");
    }

    tracing::info!(
        stage = %cli.stage,
        pages = options.pages,
        window = ?options.window_size,
        "bootstrapping hyperscroll stage"
    );
    run_stage(cli.stage, options)
}

/// One engine window plus its subscription to the phase controller.
struct StagePane {
    window: Arc<Window>,
    engine: EngineKind,
    samples: Receiver<PhaseSample>,
    sink_id: SinkId,
    pacer: FramePacer,
}

enum EngineKind {
    Field(FieldRenderer),
    Tunnel(TunnelEngine),
}

impl EngineKind {
    fn apply_phase(&mut self, sample: &PhaseSample) {
        match self {
            EngineKind::Field(field) => field.apply_phase(sample),
            EngineKind::Tunnel(tunnel) => tunnel.apply_phase(sample),
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        match self {
            EngineKind::Field(field) => field.resize(size),
            EngineKind::Tunnel(tunnel) => tunnel.resize(size),
        }
    }

    fn tick(&mut self, sample: renderer::TimeSample) -> Result<(), renderer::SurfaceError> {
        match self {
            EngineKind::Field(field) => field.tick(sample),
            EngineKind::Tunnel(tunnel) => tunnel.tick(sample),
        }
    }

    fn recover(&mut self) {
        match self {
            EngineKind::Field(field) => field.recover(),
            EngineKind::Tunnel(tunnel) => tunnel.recover(),
        }
    }

    fn dispose(&mut self) {
        match self {
            EngineKind::Field(field) => field.dispose(),
            EngineKind::Tunnel(tunnel) => tunnel.dispose(),
        }
    }
}

/// Forwards controller pushes into a pane's channel.
struct ChannelSink(Sender<PhaseSample>);

impl PhaseSink for ChannelSink {
    fn on_sample(&mut self, sample: &PhaseSample) {
        let _ = self.0.send(*sample);
    }
}

fn run_stage(stage: StageSelection, options: StageOptions) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window_size = PhysicalSize::new(options.window_size.0, options.window_size.1);

    let counters = ScopeCounters::new();
    let mut controller = ScrollPhaseController::new();
    let mut panes: Vec<StagePane> = Vec::new();

    let wants_field = matches!(stage, StageSelection::Field | StageSelection::Both);
    let wants_tunnel = matches!(stage, StageSelection::Tunnel | StageSelection::Both);

    if wants_field {
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("Hyperscroll Field")
                .with_inner_size(window_size)
                .build(&event_loop)
                .context("failed to create field window")?,
        );
        let engine = FieldRenderer::mount_with_counters(
            window.as_ref(),
            window.inner_size(),
            options.field.clone(),
            counters.clone(),
        )?;
        panes.push(attach_pane(
            &mut controller,
            window,
            EngineKind::Field(engine),
            options.target_fps,
        ));
    }

    if wants_tunnel {
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("Hyperscroll Tunnel")
                .with_inner_size(window_size)
                .build(&event_loop)
                .context("failed to create tunnel window")?,
        );
        let engine = TunnelEngine::mount_with_counters(
            window.as_ref(),
            window.inner_size(),
            options.tunnel.clone(),
            counters.clone(),
        )?;
        panes.push(attach_pane(
            &mut controller,
            window,
            EngineKind::Tunnel(engine),
            options.target_fps,
        ));
    }

    let mut document = VirtualDocument::new(options.pages, window_size.height as f32);
    let mut time_source = time_source_for_policy(&options.policy);
    let frozen_progress = options.frozen_progress;

    // Seed every pane with the starting sample before the first frame.
    match frozen_progress {
        Some(progress) => controller.push_progress(progress),
        None => controller.on_scroll_position_changed(
            document.offset(),
            document.document_height(),
            document.viewport_height(),
        ),
    };

    for pane in &panes {
        pane.window.request_redraw();
    }

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { window_id, event } => {
                    let Some(index) = panes.iter().position(|pane| pane.window.id() == window_id)
                    else {
                        return;
                    };

                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            teardown(&mut panes, &mut controller, &counters);
                            elwt.exit();
                        }
                        WindowEvent::Resized(new_size) => {
                            panes[index].engine.resize(new_size);
                            if index == 0 && frozen_progress.is_none() {
                                document.set_viewport_height(new_size.height as f32);
                                controller.on_scroll_position_changed(
                                    document.offset(),
                                    document.document_height(),
                                    document.viewport_height(),
                                );
                            }
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            let size = panes[index].window.inner_size();
                            if let EngineKind::Field(field) = &mut panes[index].engine {
                                let (x, y) = pointer_ndc(
                                    position.x as f32,
                                    position.y as f32,
                                    size.width as f32,
                                    size.height as f32,
                                );
                                field.set_pointer(x, y);
                            }
                        }
                        WindowEvent::MouseWheel { delta, .. } => {
                            if frozen_progress.is_none() {
                                document.apply_wheel(delta);
                                let sample = controller.on_scroll_position_changed(
                                    document.offset(),
                                    document.document_height(),
                                    document.viewport_height(),
                                );
                                tracing::trace!(
                                    progress = sample.progress,
                                    phase = ?sample.phase,
                                    "scroll update"
                                );
                            }
                        }
                        WindowEvent::RedrawRequested => {
                            let pane = &mut panes[index];
                            if !pane.pacer.should_render(Instant::now()) {
                                return;
                            }
                            if let Some(sample) = pane.samples.try_iter().last() {
                                pane.engine.apply_phase(&sample);
                            }
                            let time = time_source.sample();
                            match pane.engine.tick(time) {
                                Ok(()) => {}
                                Err(renderer::SurfaceError::Lost | renderer::SurfaceError::Outdated) => {
                                    pane.engine.recover();
                                }
                                Err(renderer::SurfaceError::OutOfMemory) => {
                                    tracing::error!("surface out of memory; exiting");
                                    teardown(&mut panes, &mut controller, &counters);
                                    elwt.exit();
                                }
                                Err(renderer::SurfaceError::Timeout) => {
                                    tracing::warn!("surface timeout; retrying next frame");
                                }
                                Err(other) => {
                                    tracing::warn!(error = ?other, "surface error; retrying next frame");
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    for pane in &panes {
                        pane.window.request_redraw();
                    }
                }
                Event::LoopExiting => {
                    teardown(&mut panes, &mut controller, &counters);
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}

fn attach_pane(
    controller: &mut ScrollPhaseController,
    window: Arc<Window>,
    engine: EngineKind,
    target_fps: Option<f32>,
) -> StagePane {
    let (tx, rx) = crossbeam_channel::unbounded();
    let sink_id = controller.attach(Box::new(ChannelSink(tx)));
    StagePane {
        window,
        engine,
        samples: rx,
        sink_id,
        pacer: FramePacer::new(target_fps),
    }
}

/// Detaches subscriptions and disposes engines in one teardown step.
///
/// Safe to run more than once; dispose and detach are both idempotent.
fn teardown(
    panes: &mut [StagePane],
    controller: &mut ScrollPhaseController,
    counters: &ScopeCounters,
) {
    for pane in panes.iter_mut() {
        controller.detach(pane.sink_id);
        pane.engine.dispose();
    }
    if counters.balanced() {
        tracing::debug!(
            acquired = counters.acquired(),
            "stage teardown complete; all resources released"
        );
    } else {
        tracing::warn!(
            acquired = counters.acquired(),
            released = counters.released(),
            "stage teardown left unbalanced resource counters"
        );
    }
}

/// Maps a window-space cursor position onto the NDC square, +Y up.
fn pointer_ndc(x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
    let width = width.max(1.0);
    let height = height.max(1.0);
    ((x / width) * 2.0 - 1.0, 1.0 - (y / height) * 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("hyperscroll").chain(args.iter().copied()))
    }

    #[test]
    fn cli_overrides_win_over_config() {
        let config = StageConfig::from_toml_str("[stage]\npages = 4\n").unwrap();
        let options =
            merge_options(&cli(&["--pages", "9", "--window-size", "640x480"]), &config).unwrap();
        assert_eq!(options.pages, 9);
        assert_eq!(options.window_size, (640, 480));
        assert_eq!(options.policy, RenderPolicy::Animate { target_fps: None });
    }

    #[test]
    fn config_values_survive_without_overrides() {
        let config = StageConfig::from_toml_str(
            "[stage]\npages = 4\n[field]\nspeed = 2.5\n[tunnel]\nseed = 11\n",
        )
        .unwrap();
        let options = merge_options(&cli(&[]), &config).unwrap();
        assert_eq!(options.pages, 4);
        assert_eq!(options.field.speed, 2.5);
        assert_eq!(options.tunnel.seed, 11);
    }

    #[test]
    fn still_time_freezes_the_policy() {
        let config = StageConfig::default();
        let options =
            merge_options(&cli(&["--still-time", "3.5", "--progress", "0.7"]), &config).unwrap();
        assert_eq!(
            options.policy,
            RenderPolicy::Still {
                time: 3.5,
                progress: 0.7
            }
        );
        assert_eq!(options.frozen_progress, Some(0.7));
    }

    #[test]
    fn out_of_range_progress_is_rejected() {
        let config = StageConfig::default();
        assert!(merge_options(&cli(&["--progress", "1.5"]), &config).is_err());
    }

    #[test]
    fn transparent_flag_switches_surface_alpha() {
        let config = StageConfig::default();
        let opaque = merge_options(&cli(&[]), &config).unwrap();
        assert_eq!(opaque.field.surface_alpha, SurfaceAlpha::Opaque);
        let transparent = merge_options(&cli(&["--transparent"]), &config).unwrap();
        assert_eq!(transparent.field.surface_alpha, SurfaceAlpha::Coverage);
    }

    #[test]
    fn zero_fps_means_uncapped() {
        let config = StageConfig::default();
        let options = merge_options(&cli(&["--fps", "0"]), &config).unwrap();
        assert_eq!(options.target_fps, None);
    }

    #[test]
    fn pointer_maps_to_centered_ndc() {
        assert_eq!(pointer_ndc(400.0, 300.0, 800.0, 600.0), (0.0, 0.0));
        assert_eq!(pointer_ndc(0.0, 0.0, 800.0, 600.0), (-1.0, 1.0));
        assert_eq!(pointer_ndc(800.0, 600.0, 800.0, 600.0), (1.0, -1.0));
    }
}
