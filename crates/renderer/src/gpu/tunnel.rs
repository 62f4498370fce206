use anyhow::{Context as AnyhowContext, Result};
use glam::{Mat4, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::naga::ShaderStage;
use wgpu::util::{DeviceExt, TextureDataOrder};
use winit::dpi::PhysicalSize;

use lifecycle::{FrameLoop, ResourceScope, ScopeCounters};
use scrollphase::PhaseSample;

use crate::compile::{
    compile_glsl, SHARD_FRAGMENT_GLSL, SHARD_VERTEX_GLSL, TUNNEL_FRAGMENT_GLSL, TUNNEL_VERTEX_GLSL,
};
use crate::gpu::context::{GpuContext, SurfaceColorSpace};
use crate::gpu::uniforms::TunnelUniforms;
use crate::gpu::MultisampleTarget;
use crate::mesh::{build_tube, shard_instances, shard_sites, ShardInstance, ShardSite, TubeVertex};
use crate::runtime::TimeSample;
use crate::starfield::star_field_rgba;
use crate::types::TunnelConfig;

const TUBE_RINGS: usize = 64;
const TUBE_SEGMENTS: usize = 32;
const TUBE_RADIUS: f32 = 2.0;
const STAR_TEXTURE_SIZE: u32 = 512;
const SHARD_ROWS: u32 = 4;
const SHARD_COLS: u32 = 4;
const CAMERA_FOV_RADIANS: f32 = 1.22;

/// The hyperdrive engine: a textured tube flown through by a jittering
/// camera, captured offscreen and reassembled (or scattered) by the shard
/// pass every frame.
pub struct TunnelEngine {
    inner: Option<TunnelState>,
    frames: FrameLoop,
    scope: ResourceScope,
    config: TunnelConfig,
    galaxy_progress: f32,
    shatter_progress: f32,
    flash: f32,
}

impl TunnelEngine {
    /// Mounts the tunnel into the given window target: builds the tube
    /// mesh along the fixed S-curve, generates and uploads the star-field
    /// texture, and prepares both render passes.
    pub fn mount<T>(target: &T, size: PhysicalSize<u32>, config: TunnelConfig) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        Self::mount_with_counters(target, size, config, ScopeCounters::new())
    }

    /// Mount variant that reports acquisitions into shared counters.
    pub fn mount_with_counters<T>(
        target: &T,
        size: PhysicalSize<u32>,
        config: TunnelConfig,
        counters: ScopeCounters,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let mut scope = ResourceScope::with_counters("tunnel", counters);
        let inner = TunnelState::new(target, size, &config)?;
        scope
            .acquire("tunnel gpu state", || {
                tracing::debug!("tunnel gpu state released");
            })
            .context("tunnel scope rejected the gpu state acquisition")?;

        Ok(Self {
            inner: Some(inner),
            frames: FrameLoop::new(),
            scope,
            config,
            galaxy_progress: 0.0,
            shatter_progress: 0.0,
            flash: 0.0,
        })
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.is_some()
    }

    pub fn size(&self) -> Option<PhysicalSize<u32>> {
        self.inner.as_ref().map(|state| state.context.size)
    }

    /// Applies the scroll-derived parameters this engine subscribes to.
    pub fn apply_phase(&mut self, sample: &PhaseSample) {
        self.galaxy_progress = sample.galaxy_progress;
        self.shatter_progress = sample.shatter_progress;
        self.flash = sample.flash_opacity;
    }

    /// Horizontal repeat after hyperdrive compression at the current
    /// galaxy progress.
    pub fn current_repeat(&self) -> f32 {
        self.config.repeat_start
            + (self.config.repeat_end - self.config.repeat_start) * self.galaxy_progress
    }

    /// Updates camera aspect and surface size; zero dimensions are skipped.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(state) = self.inner.as_mut() else {
            return;
        };
        if state.context.resize(new_size) {
            state.rebuild_resize_targets();
        }
    }

    /// Advances the perpetual texture flow and renders one frame.
    ///
    /// The vertical offset moves with time regardless of progress; camera
    /// jitter amplitude scales linearly with galaxy progress. No-op after
    /// dispose.
    pub fn tick(&mut self, sample: TimeSample) -> Result<(), wgpu::SurfaceError> {
        if self.frames.next_frame().is_none() {
            return Ok(());
        }
        let repeat = self.current_repeat();
        let amplitude = self.config.jitter * self.galaxy_progress;
        let Some(state) = self.inner.as_mut() else {
            return Ok(());
        };

        let v_offset = sample.seconds * self.config.flow_speed;
        state
            .uniforms
            .set_scroll(repeat, v_offset, self.flash, self.shatter_progress);

        let jitter = if amplitude > 0.0 {
            let x = state.jitter_rng.gen_range(-amplitude..amplitude);
            let y = state.jitter_rng.gen_range(-amplitude..amplitude);
            Vec3::new(x, y, 0.0)
        } else {
            Vec3::ZERO
        };
        state.update_camera(jitter);

        state.render_frame(self.shatter_progress)
    }

    /// Reconfigures the swapchain after a lost or outdated surface error.
    pub fn recover(&mut self) {
        if let Some(state) = self.inner.as_ref() {
            state.context.reconfigure();
        }
    }

    /// Releases mesh, texture, and render surface; idempotent.
    pub fn dispose(&mut self) {
        self.frames.cancel();
        self.scope.release();
        self.inner = None;
    }
}

impl Drop for TunnelEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Owns every GPU object behind one mounted tunnel.
struct TunnelState {
    context: GpuContext,
    tube_pipeline: wgpu::RenderPipeline,
    shard_pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniforms: TunnelUniforms,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    star_bind_group: wgpu::BindGroup,
    _star_texture: wgpu::Texture,
    sampler: wgpu::Sampler,
    scene_target: SceneTarget,
    scene_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    sites: Vec<ShardSite>,
    multisample_target: Option<MultisampleTarget>,
    jitter_rng: SmallRng,
}

/// Offscreen capture of the tube pass, sampled by the shard pass.
struct SceneTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl SceneTarget {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, size: PhysicalSize<u32>) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tunnel scene capture"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

impl TunnelState {
    fn new<T>(target: &T, size: PhysicalSize<u32>, config: &TunnelConfig) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, config.antialiasing, config.color_space)?;
        let device = &context.device;

        let tunnel_vertex = compile_glsl(
            device,
            "tunnel vertex",
            TUNNEL_VERTEX_GLSL,
            ShaderStage::Vertex,
        )?;
        let tunnel_fragment = compile_glsl(
            device,
            "tunnel fragment",
            TUNNEL_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        )?;
        let shard_vertex = compile_glsl(
            device,
            "shard vertex",
            SHARD_VERTEX_GLSL,
            ShaderStage::Vertex,
        )?;
        let shard_fragment = compile_glsl(
            device,
            "shard fragment",
            SHARD_FRAGMENT_GLSL,
            ShaderStage::Fragment,
        )?;

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tunnel bind layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tunnel pipeline layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        // The tube renders into a single-sample offscreen capture; only the
        // shard pass (whose rotated edges actually alias) runs at the
        // negotiated MSAA count.
        let tube_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tube pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &tunnel_vertex,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<TubeVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 12,
                            shader_location: 1,
                        },
                    ],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // The camera sits inside the tube, so back faces are the
                // visible ones.
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &tunnel_fragment,
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

        let shard_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shard pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shard_vertex,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<ShardInstance>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 0,
                            shader_location: 0,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 8,
                            shader_location: 1,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 16,
                            shader_location: 2,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x4,
                            offset: 24,
                            shader_location: 3,
                        },
                    ],
                }],
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
                module: &shard_fragment,
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

        let mesh = build_tube(TUBE_RINGS, TUBE_SEGMENTS, TUBE_RADIUS);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tube vertices"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tube indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        // Star texture format follows the swapchain's color handling so the
        // texture and the output stay in one linear-light interpretation.
        let star_format = match context.color_space {
            SurfaceColorSpace::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
            SurfaceColorSpace::Gamma => wgpu::TextureFormat::Rgba8Unorm,
        };
        let star_pixels = star_field_rgba(STAR_TEXTURE_SIZE, STAR_TEXTURE_SIZE, config.seed);
        let star_texture = device.create_texture_with_data(
            &context.queue,
            &wgpu::TextureDescriptor {
                label: Some("star field texture"),
                size: wgpu::Extent3d {
                    width: STAR_TEXTURE_SIZE,
                    height: STAR_TEXTURE_SIZE,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: star_format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            &star_pixels,
        );
        let star_view = star_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::MirrorRepeat,
            address_mode_v: wgpu::AddressMode::MirrorRepeat,
            address_mode_w: wgpu::AddressMode::MirrorRepeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniforms = TunnelUniforms::new();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tunnel uniform buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let star_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("star bind group"),
            layout: &bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&star_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let scene_target = SceneTarget::new(device, context.surface_format, context.size);
        let scene_bind_group = build_scene_bind_group(
            device,
            &bind_layout,
            &uniform_buffer,
            &scene_target.view,
            &sampler,
        );

        let sites = shard_sites(SHARD_ROWS, SHARD_COLS, config.seed);
        let instances = shard_instances(&sites, 0.0);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shard instances"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        let index_count = mesh.index_count();
        Ok(Self {
            context,
            tube_pipeline,
            shard_pipeline,
            bind_layout,
            uniform_buffer,
            uniforms,
            vertex_buffer,
            index_buffer,
            index_count,
            star_bind_group,
            _star_texture: star_texture,
            sampler,
            scene_target,
            scene_bind_group,
            instance_buffer,
            sites,
            multisample_target,
            jitter_rng: SmallRng::seed_from_u64(config.seed),
        })
    }

    /// Rebuilds everything that depends on the surface extent.
    fn rebuild_resize_targets(&mut self) {
        let device = &self.context.device;
        self.scene_target = SceneTarget::new(device, self.context.surface_format, self.context.size);
        self.scene_bind_group = build_scene_bind_group(
            device,
            &self.bind_layout,
            &self.uniform_buffer,
            &self.scene_target.view,
            &self.sampler,
        );
        self.multisample_target = (self.context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                device,
                self.context.surface_format,
                self.context.size,
                self.context.sample_count,
            )
        });
    }

    fn update_camera(&mut self, jitter: Vec3) {
        let aspect = self.context.size.width.max(1) as f32 / self.context.size.height.max(1) as f32;
        let projection = Mat4::perspective_rh(CAMERA_FOV_RADIANS, aspect, 0.05, 60.0);
        let eye = crate::mesh::centerline_point(0.02, &crate::mesh::TUBE_CONTROL_POINTS) + jitter;
        let target = crate::mesh::centerline_point(0.25, &crate::mesh::TUBE_CONTROL_POINTS);
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        self.uniforms.set_view_proj(projection * view);
    }

    fn render_frame(&mut self, shatter: f32) -> Result<(), wgpu::SurfaceError> {
        let queue = &self.context.queue;
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
        let instances = shard_instances(&self.sites, shatter);
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));

        let frame = self.context.surface.get_current_texture()?;
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("tunnel encoder"),
                });

        {
            let mut tube_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tube pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.scene_target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            tube_pass.set_pipeline(&self.tube_pipeline);
            tube_pass.set_bind_group(0, &self.star_bind_group, &[]);
            tube_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            tube_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            tube_pass.draw_indexed(0..self.index_count, 0, 0..1);
        }

        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(&frame_view)),
            None => (&frame_view, None),
        };

        {
            let mut shard_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shard pass"),
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
            shard_pass.set_pipeline(&self.shard_pipeline);
            shard_pass.set_bind_group(0, &self.scene_bind_group, &[]);
            shard_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
            shard_pass.draw(0..6, 0..instances.len() as u32);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        tracing::trace!(
            width = self.context.size.width,
            height = self.context.size.height,
            "presented tunnel frame"
        );
        Ok(())
    }
}

fn build_scene_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_buffer: &wgpu::Buffer,
    scene_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("scene bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(scene_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_interpolates_from_wide_to_narrow() {
        let config = TunnelConfig::default();
        let mut engine = TunnelEngine {
            inner: None,
            frames: FrameLoop::new(),
            scope: ResourceScope::new("test"),
            config,
            galaxy_progress: 0.0,
            shatter_progress: 0.0,
            flash: 0.0,
        };
        assert_eq!(engine.current_repeat(), 10.0);
        engine.galaxy_progress = 1.0;
        assert!((engine.current_repeat() - 0.3).abs() < 1e-6);
        engine.galaxy_progress = 0.5;
        assert!((engine.current_repeat() - 5.15).abs() < 1e-4);
    }

    #[test]
    fn unmounted_engine_ignores_updates() {
        let mut engine = TunnelEngine {
            inner: None,
            frames: FrameLoop::new(),
            scope: ResourceScope::new("test"),
            config: TunnelConfig::default(),
            galaxy_progress: 0.0,
            shatter_progress: 0.0,
            flash: 0.0,
        };
        engine.resize(PhysicalSize::new(640, 480));
        assert!(engine.tick(TimeSample::new(1.0, 0)).is_ok());
        engine.dispose();
        engine.dispose();
        assert!(!engine.is_mounted());
    }
}
