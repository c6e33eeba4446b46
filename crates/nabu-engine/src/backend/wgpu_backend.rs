//! [`GpuBackend`] over wgpu.
//!
//! Handles map to wgpu objects held in tables. A "framebuffer" is a slot
//! holding the texture attached to it; binding one makes that texture's view
//! the color attachment of subsequent passes. Each clear and draw is its own
//! submission so queue writes (geometry, uniforms) land in call order.

use std::collections::HashMap;
use std::ops::Range;

use wgpu::util::DeviceExt;

use super::{
    BlendMode, DrawTarget, FramebufferHandle, GpuBackend, ProgramDesc, ProgramHandle,
    TargetBinding, TextureDesc, TextureFilter, TextureHandle, UNIFORM_FLOATS,
};
use crate::shader::ShaderError;

/// Format of every offscreen texture (sprite sheets, render targets).
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    filter: TextureFilter,
    render_target: bool,
}

struct GpuProgram {
    module: wgpu::ShaderModule,
    blend: BlendMode,
    label: String,
    uniforms: wgpu::Buffer,
    pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    linear: wgpu::Sampler,
    nearest: wgpu::Sampler,

    textures: HashMap<TextureHandle, GpuTexture>,
    framebuffers: HashMap<FramebufferHandle, Option<TextureHandle>>,
    programs: HashMap<ProgramHandle, GpuProgram>,
    next_id: u32,

    /// Current frame's surface view, set by the runtime around presentation.
    surface: Option<(wgpu::TextureView, wgpu::TextureFormat)>,
    bound: Option<TargetBinding>,
    geometry: Option<(wgpu::Buffer, wgpu::Buffer)>,
    warned_no_surface: bool,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nabu bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(UNIFORM_BYTES),
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
            label: Some("nabu pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let sampler = |label, filter| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter,
                min_filter: filter,
                ..Default::default()
            })
        };
        let linear = sampler("nabu linear sampler", wgpu::FilterMode::Linear);
        let nearest = sampler("nabu nearest sampler", wgpu::FilterMode::Nearest);

        Self {
            device,
            queue,
            bind_group_layout,
            pipeline_layout,
            linear,
            nearest,
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            programs: HashMap::new(),
            next_id: 0,
            surface: None,
            bound: None,
            geometry: None,
            warned_no_surface: false,
        }
    }

    /// Sets (or clears) the view draws to [`DrawTarget::Surface`] land on.
    pub fn set_surface(&mut self, surface: Option<(wgpu::TextureView, wgpu::TextureFormat)>) {
        self.surface = surface;
        if self.surface.is_some() {
            self.warned_no_surface = false;
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// View and format of the bound target.
    fn bound_view(&mut self) -> Option<(wgpu::TextureView, wgpu::TextureFormat)> {
        let binding = self.bound?;
        match binding.target {
            DrawTarget::Surface => {
                if self.surface.is_none() && !self.warned_no_surface {
                    log::warn!("WgpuBackend: surface target bound without a surface view; skipping");
                    self.warned_no_surface = true;
                }
                self.surface.clone()
            }
            DrawTarget::Framebuffer(fb) => {
                let texture = self.framebuffers.get(&fb).copied().flatten()?;
                let tex = self.textures.get(&texture)?;
                Some((tex.view.clone(), OFFSCREEN_FORMAT))
            }
        }
    }

    fn submit_pass(
        &self,
        label: &str,
        view: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
        record: impl FnOnce(&mut wgpu::RenderPass<'_>),
    ) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            record(&mut rpass);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

const UNIFORM_BYTES: u64 = (UNIFORM_FLOATS * std::mem::size_of::<f32>()) as u64;

impl GpuBackend for WgpuBackend {
    fn create_texture(&mut self, desc: &TextureDesc, rgba: Option<&[u8]>) -> Option<TextureHandle> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            log::error!(
                "WgpuBackend: texture size {}x{} outside 1..={max}",
                desc.width,
                desc.height
            );
            return None;
        }
        if let Some(data) = rgba
            && data.len() != desc.byte_len()
        {
            log::error!("WgpuBackend: {} bytes of texel data, expected {}", data.len(), desc.byte_len());
            return None;
        }

        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        if desc.render_target {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }

        let extent = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(if desc.render_target { "nabu render target" } else { "nabu sheet" }),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage,
            view_formats: &[],
        });

        if let Some(data) = rgba {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * desc.width),
                    rows_per_image: Some(desc.height),
                },
                extent,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let handle = TextureHandle::new(self.next());
        self.textures.insert(
            handle,
            GpuTexture {
                texture,
                view,
                filter: desc.filter,
                render_target: desc.render_target,
            },
        );
        Some(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        match self.textures.remove(&texture) {
            Some(t) => t.texture.destroy(),
            None => log::warn!("WgpuBackend: destroy of unknown texture {}", texture.raw()),
        }
    }

    fn create_framebuffer(&mut self) -> Option<FramebufferHandle> {
        let handle = FramebufferHandle::new(self.next());
        self.framebuffers.insert(handle, None);
        Some(handle)
    }

    fn attach_color(&mut self, framebuffer: FramebufferHandle, texture: TextureHandle) {
        if let Some(slot) = self.framebuffers.get_mut(&framebuffer) {
            *slot = Some(texture);
        }
    }

    fn is_framebuffer_complete(&self, framebuffer: FramebufferHandle) -> bool {
        self.framebuffers
            .get(&framebuffer)
            .copied()
            .flatten()
            .and_then(|t| self.textures.get(&t))
            .is_some_and(|t| t.render_target)
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if self.framebuffers.remove(&framebuffer).is_none() {
            log::warn!("WgpuBackend: destroy of unknown framebuffer {}", framebuffer.raw());
        }
        if let Some(b) = self.bound
            && b.target == DrawTarget::Framebuffer(framebuffer)
        {
            self.bound = None;
        }
    }

    fn bind_target(&mut self, binding: TargetBinding) {
        self.bound = Some(binding);
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        let Some((view, _)) = self.bound_view() else { return };
        let color = wgpu::Color {
            r: rgba[0] as f64,
            g: rgba[1] as f64,
            b: rgba[2] as f64,
            a: rgba[3] as f64,
        };
        self.submit_pass("nabu clear", &view, wgpu::LoadOp::Clear(color), |_| {});
    }

    fn upload_geometry(&mut self, positions: &[f32], uvs: &[f32]) {
        if positions.is_empty() {
            self.geometry = None;
            return;
        }
        let buffer = |label, data: &[f32]| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            })
        };
        self.geometry = Some((buffer("nabu positions", positions), buffer("nabu uvs", uvs)));
    }

    fn compile_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle, ShaderError> {
        // Sources arrive validated by naga; wgpu re-parses the same WGSL.
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.as_str().into()),
        });
        let uniforms = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&desc.label),
            size: UNIFORM_BYTES,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let handle = ProgramHandle::new(self.next());
        self.programs.insert(
            handle,
            GpuProgram {
                module,
                blend: desc.blend,
                label: desc.label.clone(),
                uniforms,
                pipelines: HashMap::new(),
            },
        );
        log::debug!("WgpuBackend: compiled program `{}`", desc.label);
        Ok(handle)
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        match self.programs.remove(&program) {
            Some(p) => p.uniforms.destroy(),
            None => log::warn!("WgpuBackend: destroy of unknown program {}", program.raw()),
        }
    }

    fn write_uniforms(&mut self, program: ProgramHandle, data: &[f32; UNIFORM_FLOATS]) {
        if let Some(p) = self.programs.get(&program) {
            self.queue.write_buffer(&p.uniforms, 0, bytemuck::cast_slice(data));
        }
    }

    fn draw(&mut self, program: ProgramHandle, texture: TextureHandle, vertices: Range<u32>) {
        if vertices.is_empty() {
            return;
        }
        let Some((view, format)) = self.bound_view() else { return };

        let Self {
            device,
            pipeline_layout,
            bind_group_layout,
            programs,
            textures,
            geometry,
            linear,
            nearest,
            ..
        } = self;

        let Some(program) = programs.get_mut(&program) else {
            log::warn!("WgpuBackend: draw with unknown program {}", program.raw());
            return;
        };
        let Some(tex) = textures.get(&texture) else {
            log::warn!("WgpuBackend: draw with unknown texture {}", texture.raw());
            return;
        };
        let Some((positions, uvs)) = geometry.as_ref() else { return };

        let GpuProgram {
            module,
            blend,
            label,
            uniforms,
            pipelines,
        } = program;
        let pipeline = pipelines
            .entry(format)
            .or_insert_with(|| build_pipeline(device, pipeline_layout, module, label, *blend, format))
            .clone();

        let sampler = match tex.filter {
            TextureFilter::Linear => &*linear,
            TextureFilter::Nearest => &*nearest,
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nabu bind group"),
            layout: bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&tex.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        let positions = positions.clone();
        let uvs = uvs.clone();

        self.submit_pass("nabu draw", &view, wgpu::LoadOp::Load, |rpass| {
            rpass.set_pipeline(&pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, positions.slice(..));
            rpass.set_vertex_buffer(1, uvs.slice(..));
            rpass.draw(vertices, 0..1);
        });
    }

    fn finish(&mut self) {
        if let Err(e) = self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        }) {
            log::warn!("WgpuBackend: device poll failed: {e}");
        }
    }

    fn flips_render_targets(&self) -> bool {
        false
    }
}

fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    match mode {
        BlendMode::PremultipliedAlpha => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        }),
        BlendMode::Replace => Some(wgpu::BlendState::REPLACE),
    }
}

const STREAM_ATTRS: [[wgpu::VertexAttribute; 1]; 2] = [
    wgpu::vertex_attr_array![0 => Float32x2],
    wgpu::vertex_attr_array![1 => Float32x2],
];

fn build_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    label: &str,
    blend: BlendMode,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let stream = |attrs: &'static [wgpu::VertexAttribute]| wgpu::VertexBufferLayout {
        array_stride: (2 * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: attrs,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[stream(&STREAM_ATTRS[0]), stream(&STREAM_ATTRS[1])],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: blend_state(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
