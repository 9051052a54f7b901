//! wgpu implementation of the backend seam.
//!
//! Draw calls accumulate during a frame and replay into a single render pass
//! at `end_frame`. Each draw snapshots the program's staged uniforms into its
//! own small uniform buffer, so per-actor state never aliases. Wireframe and
//! point fills map onto polygon modes / point-list topology; patch primitives
//! fall back to triangle lists because WGSL has no tessellation stages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use wgpu::util::DeviceExt;

use super::{BufferHandle, GpuBackend, PrimitiveKind, ProgramHandle, ShaderStage, UniformValue};
use crate::error::{Result, SceneError};
use crate::gfx::scene::Vertex;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.12,
    a: 1.0,
};

/// CPU mirror of the WGSL `Uniforms` block shared by every program.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    material: crate::gfx::material::MaterialUniform,
    light: crate::gfx::material::LightUniform,
    levels: [f32; 4],
}

impl Default for Uniforms {
    fn default() -> Self {
        const IDENTITY: [[f32; 4]; 4] = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        Self {
            view: IDENTITY,
            projection: IDENTITY,
            model: IDENTITY,
            material: crate::gfx::material::Material::default().to_uniform(),
            light: crate::gfx::material::Light::default().to_uniform(),
            levels: [1.0, 1.0, 0.0, 0.0],
        }
    }
}

struct Program {
    fill: wgpu::RenderPipeline,
    line: Option<wgpu::RenderPipeline>,
    points: wgpu::RenderPipeline,
    staging: Uniforms,
}

#[derive(Debug, Clone, Copy)]
struct DrawCmd {
    program: u32,
    primitive: PrimitiveKind,
    uniforms_index: u32,
    vertices: BufferHandle,
    indices: Option<BufferHandle>,
    first: u32,
    count: u32,
}

struct DepthTexture {
    view: wgpu::TextureView,
}

impl DepthTexture {
    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { view }
    }
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    format: wgpu::TextureFormat,
    depth: DepthTexture,

    uniform_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    programs: Vec<Program>,
    buffers: HashMap<BufferHandle, wgpu::Buffer>,
    next_buffer: u32,

    pending: Vec<DrawCmd>,
    snapshots: Vec<Uniforms>,

    line_mode: bool,
    warned_line_fallback: bool,
    warned_patches: bool,

    timing_supported: bool,
    timing_requested: bool,
    timing_query: Option<TimingQuery>,
}

struct TimingQuery {
    query_set: wgpu::QuerySet,
    resolve_buffer: wgpu::Buffer,
    result_buffer: wgpu::Buffer,
    in_flight: bool,
    mapped: Arc<AtomicBool>,
    period_ns: f32,
}

impl WgpuBackend {
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> WgpuBackend {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to request adapter!");

        let optional = wgpu::Features::POLYGON_MODE_LINE | wgpu::Features::TIMESTAMP_QUERY;
        let features = adapter.features() & optional;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: features,
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .expect("Failed to request a device!");

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .unwrap_or(surface_capabilities.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: surface_capabilities.present_modes[0],
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth = DepthTexture::create(&device, width, height);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniforms layout"),
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
            label: None,
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let line_mode = features.contains(wgpu::Features::POLYGON_MODE_LINE);
        let timing_supported = features.contains(wgpu::Features::TIMESTAMP_QUERY);
        let period_ns = queue.get_timestamp_period();

        let timing_query = timing_supported.then(|| TimingQuery {
            query_set: device.create_query_set(&wgpu::QuerySetDescriptor {
                label: Some("frame timing"),
                ty: wgpu::QueryType::Timestamp,
                count: 2,
            }),
            resolve_buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("timing resolve"),
                size: 16,
                usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            }),
            result_buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("timing result"),
                size: 16,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            in_flight: false,
            mapped: Arc::new(AtomicBool::new(false)),
            period_ns,
        });

        WgpuBackend {
            surface,
            device: device.into(),
            queue: queue.into(),
            config,
            format,
            depth,
            uniform_layout,
            pipeline_layout,
            programs: Vec::new(),
            buffers: HashMap::new(),
            next_buffer: 0,
            pending: Vec::new(),
            snapshots: Vec::new(),
            line_mode,
            warned_line_fallback: false,
            warned_patches: false,
            timing_supported,
            timing_requested: false,
            timing_query,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthTexture::create(&self.device, width, height);
    }

    fn build_pipeline(
        &self,
        module: &wgpu::ShaderModule,
        topology: wgpu::PrimitiveTopology,
        polygon_mode: wgpu::PolygonMode,
    ) -> wgpu::RenderPipeline {
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: None,
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::desc()],
                    compilation_options: Default::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode,
                    conservative: false,
                    unclipped_depth: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                multiview: None,
                cache: None,
            })
    }

    fn pipeline_for<'a>(&'a self, program: &'a Program, primitive: PrimitiveKind) -> &'a wgpu::RenderPipeline {
        match primitive {
            PrimitiveKind::Triangles | PrimitiveKind::Patches => &program.fill,
            PrimitiveKind::Points => &program.points,
            PrimitiveKind::Lines => program.line.as_ref().unwrap_or(&program.fill),
        }
    }

    /// Replay the accumulated draws into one render pass and present.
    pub fn end_frame(&mut self) {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(e) => {
                warn!("dropped frame: {e}");
                self.pending.clear();
                self.snapshots.clear();
                return;
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // one uniform buffer + bind group per draw, created up front so the
        // render pass can borrow them all
        let bind_groups: Vec<wgpu::BindGroup> = self
            .pending
            .iter()
            .map(|cmd| {
                let uniforms = self.snapshots[cmd.uniforms_index as usize];
                let buffer = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("draw uniforms"),
                        contents: bytemuck::bytes_of(&uniforms),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: None,
                    layout: &self.uniform_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            })
            .collect();

        let timed = self.timing_requested
            && self
                .timing_query
                .as_ref()
                .is_some_and(|t| !t.in_flight);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let timestamp_writes = if timed {
                self.timing_query
                    .as_ref()
                    .map(|t| wgpu::RenderPassTimestampWrites {
                        query_set: &t.query_set,
                        beginning_of_pass_write_index: Some(0),
                        end_of_pass_write_index: Some(1),
                    })
            } else {
                None
            };

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes,
            });

            for (cmd, bind_group) in self.pending.iter().zip(&bind_groups) {
                let Some(program) = self.programs.get(cmd.program as usize) else {
                    continue;
                };
                let Some(vertices) = self.buffers.get(&cmd.vertices) else {
                    continue;
                };
                pass.set_pipeline(self.pipeline_for(program, cmd.primitive));
                pass.set_bind_group(0, bind_group, &[]);
                pass.set_vertex_buffer(0, vertices.slice(..));
                match cmd.indices.and_then(|h| self.buffers.get(&h)) {
                    Some(indices) => {
                        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(cmd.first..cmd.first + cmd.count, 0, 0..1);
                    }
                    None => pass.draw(cmd.first..cmd.first + cmd.count, 0..1),
                }
            }
        }

        if timed {
            if let Some(t) = &mut self.timing_query {
                encoder.resolve_query_set(&t.query_set, 0..2, &t.resolve_buffer, 0);
                encoder.copy_buffer_to_buffer(&t.resolve_buffer, 0, &t.result_buffer, 0, 16);
                t.in_flight = true;
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        if timed {
            if let Some(t) = &self.timing_query {
                let mapped = Arc::clone(&t.mapped);
                t.result_buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                    if result.is_ok() {
                        mapped.store(true, Ordering::Release);
                    }
                });
            }
        }

        surface_texture.present();
        self.pending.clear();
        self.snapshots.clear();
        self.timing_requested = false;
    }

    fn stage_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) {
        let Some(program) = self.programs.get_mut(program.0 as usize) else {
            return;
        };
        let staging = &mut program.staging;
        match (name, value) {
            ("view", UniformValue::Mat4(m)) => staging.view = m,
            ("projection", UniformValue::Mat4(m)) => staging.projection = m,
            ("model", UniformValue::Mat4(m)) => staging.model = m,
            ("material", UniformValue::Material(m)) => staging.material = m,
            ("light", UniformValue::Light(l)) => staging.light = l,
            ("innerLevel", UniformValue::Int(v)) => staging.levels[0] = v as f32,
            ("outerLevel", UniformValue::Int(v)) => staging.levels[1] = v as f32,
            _ => debug!("ignoring unknown uniform {name:?}"),
        }
    }

    fn push_draw(&mut self, mut cmd: DrawCmd) {
        if cmd.primitive == PrimitiveKind::Patches && !self.warned_patches {
            debug!("patch primitives drawn as triangle lists (no tessellation stage)");
            self.warned_patches = true;
        }
        if cmd.primitive == PrimitiveKind::Lines && !self.line_mode && !self.warned_line_fallback {
            warn!("polygon line mode unsupported; wireframe falls back to solid fill");
            self.warned_line_fallback = true;
        }
        let Some(program) = self.programs.get(cmd.program as usize) else {
            return;
        };
        self.snapshots.push(program.staging);
        cmd.uniforms_index = (self.snapshots.len() - 1) as u32;
        self.pending.push(cmd);
    }
}

impl GpuBackend for WgpuBackend {
    fn compile_program(&mut self, stages: &[(ShaderStage, &str)]) -> Result<ProgramHandle> {
        let source = stages
            .iter()
            .find(|(stage, _)| *stage == ShaderStage::Vertex)
            .or(stages.first())
            .map(|(_, src)| *src)
            .ok_or_else(|| SceneError::Compile("program has no stages".into()))?;
        if stages.iter().any(|(s, _)| {
            matches!(
                s,
                ShaderStage::TessellationControl | ShaderStage::TessellationEvaluation
            )
        }) {
            debug!("tessellation stages folded into the vertex stage");
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(SceneError::Compile(err.to_string()));
        }

        let fill = self.build_pipeline(
            &module,
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::PolygonMode::Fill,
        );
        let line = self.line_mode.then(|| {
            self.build_pipeline(
                &module,
                wgpu::PrimitiveTopology::TriangleList,
                wgpu::PolygonMode::Line,
            )
        });
        let points = self.build_pipeline(
            &module,
            wgpu::PrimitiveTopology::PointList,
            wgpu::PolygonMode::Fill,
        );

        let handle = ProgramHandle(self.programs.len() as u32);
        self.programs.push(Program {
            fill,
            line,
            points,
            staging: Uniforms::default(),
        });
        Ok(handle)
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) {
        self.stage_uniform(program, name, value);
    }

    fn upload_buffer(&mut self, data: &[u8]) -> BufferHandle {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh buffer"),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::INDEX,
            });
        let handle = BufferHandle(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(handle, buffer);
        handle
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
    }

    fn draw(
        &mut self,
        program: ProgramHandle,
        primitive: PrimitiveKind,
        buffer: BufferHandle,
        first: u32,
        count: u32,
    ) {
        self.push_draw(DrawCmd {
            program: program.0,
            primitive,
            uniforms_index: 0,
            vertices: buffer,
            indices: None,
            first,
            count,
        });
    }

    fn draw_indexed(
        &mut self,
        program: ProgramHandle,
        primitive: PrimitiveKind,
        vertices: BufferHandle,
        indices: BufferHandle,
        index_count: u32,
    ) {
        self.push_draw(DrawCmd {
            program: program.0,
            primitive,
            uniforms_index: 0,
            vertices,
            indices: Some(indices),
            first: 0,
            count: index_count,
        });
    }

    fn begin_timed_frame(&mut self) {
        if self.timing_supported {
            self.timing_requested = true;
        }
    }

    fn poll_elapsed_ms(&mut self) -> Option<f32> {
        let t = self.timing_query.as_mut()?;
        if !t.in_flight {
            return None;
        }
        let _ = self.device.poll(wgpu::MaintainBase::Poll);
        if !t.mapped.load(Ordering::Acquire) {
            return None;
        }

        let elapsed = {
            let view = t.result_buffer.slice(..).get_mapped_range();
            let stamps: &[u64] = bytemuck::cast_slice(view.as_ref());
            stamps[1].saturating_sub(stamps[0]) as f32 * t.period_ns / 1.0e6
        };
        t.result_buffer.unmap();
        t.mapped.store(false, Ordering::Release);
        t.in_flight = false;
        Some(elapsed)
    }
}
