//! GPU orchestration for the two engines.
//!
//! - `context` owns wgpu instance/device/surface wiring and knows how to
//!   rebuild swapchain state when the host resizes.
//! - `uniforms` mirrors the uniform blocks declared in `compile.rs` and
//!   writes changes straight through the queue each frame.
//! - `field` glues the flow-field pipeline together and exposes the
//!   [`FieldRenderer`](field::FieldRenderer) mount/tick/dispose surface.
//! - `tunnel` does the same for the tube + shard pipelines behind
//!   [`TunnelEngine`](tunnel::TunnelEngine).

pub(crate) mod context;
pub(crate) mod field;
pub(crate) mod tunnel;
pub(crate) mod uniforms;

use winit::dpi::PhysicalSize;

/// Offscreen multisample color buffer resolved into the swapchain.
pub(crate) struct MultisampleTarget {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl MultisampleTarget {
    pub(crate) fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}
