//! Renderer crate for Hyperscroll.
//!
//! Two independently-mountable engines share this crate: the flow-field
//! background and the hyperdrive tunnel. The overall flow is:
//!
//! ```text
//!   host (hyperscroll)
//!          │ FieldConfig / TunnelConfig
//!          ▼
//!   FieldRenderer::mount ──▶ GpuContext ──▶ field pipeline ──▶ tick()
//!   TunnelEngine::mount  ──▶ GpuContext ──▶ tube + shard passes ──▶ tick()
//!          ▲                          │
//!          │ PhaseSample pushes       └─▶ uniform writes each frame
//!          └── ScrollPhaseController
//! ```
//!
//! Each engine owns its complete set of GPU objects (surface, device,
//! pipelines, buffers, textures); nothing is shared across instances. The
//! frame loop, cancellation, and release bookkeeping come from the
//! `lifecycle` crate, so mounting and unmounting repeatedly leaves no
//! dangling resources and a cancelled loop can never draw into a disposed
//! surface.

mod compile;
mod gpu;
mod mesh;
mod runtime;
mod starfield;
mod types;

pub use gpu::field::FieldRenderer;
pub use gpu::tunnel::TunnelEngine;
pub use runtime::{
    time_source_for_policy, BoxedTimeSource, FixedTimeSource, FramePacer, RenderPolicy,
    SystemTimeSource, TimeSample, TimeSource,
};
pub use types::{
    Antialiasing, ColorSpaceMode, FieldConfig, Rgb, SurfaceAlpha, TunnelConfig, MAX_COLORS,
};
pub use wgpu::SurfaceError;
