use anyhow::{Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use lifecycle::{FrameLoop, ResourceScope, ScopeCounters};
use scrollphase::PhaseSample;

use crate::compile::{compile_fullscreen_vertex, compile_glsl, FIELD_FRAGMENT_GLSL};
use crate::gpu::context::GpuContext;
use crate::gpu::uniforms::FieldUniforms;
use crate::gpu::MultisampleTarget;
use crate::runtime::TimeSample;
use crate::types::{FieldConfig, Rgb};

/// The flow-field engine: one full-screen shader program driven by time,
/// pointer position, and the color palette.
///
/// All mutable render state lives in this instance; two mounted fields
/// never share a surface, a device, or a uniform buffer, so the host can
/// run several side by side without cross-talk.
pub struct FieldRenderer {
    inner: Option<FieldState>,
    frames: FrameLoop,
    scope: ResourceScope,
    config: FieldConfig,
}

impl FieldRenderer {
    /// Mounts the field into the given window target.
    ///
    /// Allocates the surface sized to the target bounds, compiles the
    /// flow-field program (compilation failure is fatal and diagnosable),
    /// and seeds the color buffer. The returned instance is ready to tick.
    pub fn mount<T>(target: &T, size: PhysicalSize<u32>, config: FieldConfig) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        Self::mount_with_counters(target, size, config, ScopeCounters::new())
    }

    /// Mount variant that reports acquisitions into shared counters so the
    /// host can assert release parity across mount/unmount cycles.
    pub fn mount_with_counters<T>(
        target: &T,
        size: PhysicalSize<u32>,
        config: FieldConfig,
        counters: ScopeCounters,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let mut scope = ResourceScope::with_counters("field", counters);
        let inner = FieldState::new(target, size, &config)?;
        scope
            .acquire("field gpu state", || {
                tracing::debug!("field gpu state released");
            })
            .context("field scope rejected the gpu state acquisition")?;

        Ok(Self {
            inner: Some(inner),
            frames: FrameLoop::new(),
            scope,
            config,
        })
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.is_some()
    }

    pub fn size(&self) -> Option<PhysicalSize<u32>> {
        self.inner.as_ref().map(|state| state.context.size)
    }

    /// Updates surface size and the aspect uniform; no-op when the
    /// dimensions are unchanged or zero.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(state) = self.inner.as_mut() else {
            return;
        };
        if state.context.resize(new_size) {
            state.rebuild_multisample_target();
            state
                .uniforms
                .set_resolution(new_size.width as f32, new_size.height as f32);
        }
    }

    /// Updates normalized pointer coordinates (clamped to `[-1, 1]`).
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        if let Some(state) = self.inner.as_mut() {
            state.uniforms.set_pointer(x, y);
        }
    }

    /// Replaces the palette; at most eight entries take effect.
    pub fn set_colors(&mut self, colors: &[Rgb]) {
        if let Some(state) = self.inner.as_mut() {
            state.uniforms.set_colors(colors);
        }
    }

    /// Applies the scroll-derived parameters this engine subscribes to.
    pub fn apply_phase(&mut self, sample: &PhaseSample) {
        if let Some(state) = self.inner.as_mut() {
            state.uniforms.set_scroll_depth(sample.grid_depth);
            state.uniforms.set_flash(sample.flash_opacity);
        }
    }

    /// Advances time and issues one draw call.
    ///
    /// Call at most once per display frame. After `dispose` (or once the
    /// frame loop is cancelled) this is a silent no-op: a cancelled loop
    /// must never draw into a released surface.
    pub fn tick(&mut self, sample: TimeSample) -> Result<(), wgpu::SurfaceError> {
        if self.frames.next_frame().is_none() {
            return Ok(());
        }
        let Some(state) = self.inner.as_mut() else {
            return Ok(());
        };
        let time = sample.seconds * self.config.speed;
        let angle = self.config.rotation + self.config.auto_rotate * sample.seconds;
        state.uniforms.set_motion(time, angle);
        state.render_frame()
    }

    /// Reconfigures the swapchain after a lost or outdated surface error.
    pub fn recover(&mut self) {
        if let Some(state) = self.inner.as_ref() {
            state.context.reconfigure();
        }
    }

    /// Releases the surface, program, and buffers; idempotent.
    pub fn dispose(&mut self) {
        self.frames.cancel();
        self.scope.release();
        self.inner = None;
    }
}

impl Drop for FieldRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Owns every GPU object behind one mounted flow field.
struct FieldState {
    context: GpuContext,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: FieldUniforms,
    multisample_target: Option<MultisampleTarget>,
}

impl FieldState {
    fn new<T>(target: &T, size: PhysicalSize<u32>, config: &FieldConfig) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, config.antialiasing, config.color_space)?;
        let device = &context.device;

        let vertex_module = compile_fullscreen_vertex(device)?;
        let fragment_module = compile_glsl(
            device,
            "flow field fragment",
            FIELD_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        )
        .context("failed to compile the flow-field fragment stage")?;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("field uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("field pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("field pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: context.sample_count,
                ..wgpu::MultisampleState::default()
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let uniforms = FieldUniforms::new(context.size.width, context.size.height, config);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("field uniform buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("field uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        Ok(Self {
            context,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            multisample_target,
        })
    }

    fn rebuild_multisample_target(&mut self) {
        self.multisample_target = (self.context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                self.context.size,
                self.context.sample_count,
            )
        });
    }

    fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("field encoder"),
                });

        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("field pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        tracing::trace!(
            width = self.context.size.width,
            height = self.context.size.height,
            "presented field frame"
        );
        Ok(())
    }
}
