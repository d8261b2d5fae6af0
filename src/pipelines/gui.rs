//! Draws egui's tessellated output on top of the 3D scene.

use std::collections::HashMap;

use anyhow::*;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GuiVertex {
    /// Position in points.
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    /// Premultiplied sRGB colour.
    pub color: [u8; 4],
}

impl GuiVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<GuiVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Unorm8x4,
                },
            ],
        }
    }
}

impl From<&egui::epaint::Vertex> for GuiVertex {
    fn from(v: &egui::epaint::Vertex) -> Self {
        Self {
            position: [v.pos.x, v.pos.y],
            tex_coords: [v.uv.x, v.uv.y],
            color: v.color.to_array(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ScreenUniform {
    size_in_points: [f32; 2],
    _padding: [f32; 2],
}

/// Scissor rectangle in physical pixels, or `None` when nothing of the clip rect is visible.
pub fn scissor_rect(clip: egui::Rect, pixels_per_point: f32, screen_px: [u32; 2]) -> Option<[u32; 4]> {
    let to_px = |v: f32, max: u32| ((v * pixels_per_point).round().max(0.0) as u32).min(max);
    let x0 = to_px(clip.min.x, screen_px[0]);
    let y0 = to_px(clip.min.y, screen_px[1]);
    let x1 = to_px(clip.max.x, screen_px[0]);
    let y1 = to_px(clip.max.y, screen_px[1]);
    (x1 > x0 && y1 > y0).then(|| [x0, y0, x1 - x0, y1 - y0])
}

/// RGBA8 pixels of an egui image, font coverage expanded to premultiplied white.
pub fn image_to_rgba8(image: &egui::ImageData) -> ([u32; 2], Vec<u8>) {
    match image {
        egui::ImageData::Color(image) => {
            let size = [image.width() as u32, image.height() as u32];
            (size, image.pixels.iter().flat_map(|p| p.to_array()).collect())
        }
        egui::ImageData::Font(image) => {
            let size = [image.width() as u32, image.height() as u32];
            (size, image.srgba_pixels(None).flat_map(|p| p.to_array()).collect())
        }
    }
}

/// One texture write derived from an entry of a [`egui::TexturesDelta`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureWrite {
    pub id: egui::TextureId,
    /// Index into `delta.set`.
    pub entry: usize,
    /// Where a partial update goes. `None` (re)creates the texture at the image size.
    pub origin: Option<[u32; 2]>,
}

/// Check every entry of `delta` against the texture sizes in `known`, in order.
///
/// Full images register their size so later partial updates in the same delta can land on
/// them. A partial update for a texture that was never created, or one that does not fit,
/// is an error for that entry only.
pub fn plan_texture_writes(
    known: &HashMap<egui::TextureId, [u32; 2]>,
    delta: &egui::TexturesDelta,
) -> Vec<Result<TextureWrite>> {
    let mut sizes = known.clone();
    let mut writes = Vec::with_capacity(delta.set.len());
    for (entry, (id, image_delta)) in delta.set.iter().enumerate() {
        let size = image_delta.image.size().map(|n| n as u32);
        if size[0] == 0 || size[1] == 0 {
            continue;
        }
        let planned = match image_delta.pos {
            Some([x, y]) => sizes
                .get(id)
                .with_context(|| format!("partial update for unknown gui texture {id:?}"))
                .and_then(|existing| {
                    let (x, y) = (x as u32, y as u32);
                    let fits = x + size[0] <= existing[0] && y + size[1] <= existing[1];
                    ensure!(fits, "partial update outside gui texture {id:?}");
                    Ok(Some([x, y]))
                }),
            None => {
                sizes.insert(*id, size);
                Ok(None)
            }
        };
        writes.push(planned.map(|origin| TextureWrite {
            id: *id,
            entry,
            origin,
        }));
    }
    writes
}

#[derive(Debug)]
struct GuiTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: [u32; 2],
}

struct DrawCall {
    texture: egui::TextureId,
    scissor: [u32; 4],
    indices: std::ops::Range<u32>,
    base_vertex: i32,
}

#[derive(Debug)]
pub struct GuiRenderer {
    pipeline: wgpu::RenderPipeline,
    screen_buffer: wgpu::Buffer,
    screen_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    textures: HashMap<egui::TextureId, GuiTexture>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

impl GuiRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let screen_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("gui screen buffer"),
            contents: bytemuck::cast_slice(&[ScreenUniform {
                size_in_points: [1.0, 1.0],
                _padding: [0.0; 2],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let screen_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("gui screen layout"),
        });
        let screen_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &screen_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: screen_buffer.as_entire_binding(),
            }],
            label: Some("gui screen bind group"),
        });
        let texture_layout = mk_texture_bind_group_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Gui Render Pipeline Layout"),
            bind_group_layouts: &[Some(&screen_layout), Some(&texture_layout)],
            immediate_size: 0,
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Gui Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("gui.wgsl").into()),
        });
        let pipeline = mk_render_pipeline(device, format, &layout, &shader);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("gui sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            screen_buffer,
            screen_bind_group,
            texture_layout,
            sampler,
            textures: HashMap::new(),
            vertex_buffer: mk_stream_buffer(device, wgpu::BufferUsages::VERTEX, 1 << 16),
            index_buffer: mk_stream_buffer(device, wgpu::BufferUsages::INDEX, 1 << 16),
        }
    }

    /// Create or patch the textures egui asks for. Call before [`render`](Self::render).
    ///
    /// Entries that cannot be applied are logged and skipped, the rest still land.
    pub fn update_textures(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        delta: &egui::TexturesDelta,
    ) {
        let known: HashMap<egui::TextureId, [u32; 2]> = self
            .textures
            .iter()
            .map(|(id, texture)| (*id, texture.size))
            .collect();
        for planned in plan_texture_writes(&known, delta) {
            let write = match planned {
                std::result::Result::Ok(write) => write,
                Err(e) => {
                    log::warn!("skipping gui texture update: {e:#}");
                    continue;
                }
            };
            let (_, image_delta) = &delta.set[write.entry];
            let (size, pixels) = image_to_rgba8(&image_delta.image);
            let origin = match write.origin {
                Some([x, y]) => wgpu::Origin3d { x, y, z: 0 },
                None => {
                    let texture = self.create_texture(device, size);
                    self.textures.insert(write.id, texture);
                    wgpu::Origin3d::ZERO
                }
            };
            let Some(target) = self.textures.get(&write.id) else {
                continue;
            };
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &target.texture,
                    mip_level: 0,
                    origin,
                },
                &pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * size[0]),
                    rows_per_image: Some(size[1]),
                },
                wgpu::Extent3d {
                    width: size[0],
                    height: size[1],
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    /// Drop textures egui no longer needs. Call after the frame was submitted.
    pub fn free_textures(&mut self, delta: &egui::TexturesDelta) {
        for id in &delta.free {
            self.textures.remove(id);
        }
    }

    fn create_texture(&self, device: &wgpu::Device, size: [u32; 2]) -> GuiTexture {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("gui texture"),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some("gui texture bind group"),
        });
        GuiTexture {
            texture,
            bind_group,
            size,
        }
    }

    /// Draw `primitives` over whatever `view` already holds.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        primitives: &[egui::ClippedPrimitive],
        pixels_per_point: f32,
        screen_px: [u32; 2],
    ) {
        let mut vertices: Vec<GuiVertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut draws = Vec::new();
        for egui::ClippedPrimitive {
            clip_rect,
            primitive,
        } in primitives
        {
            let egui::epaint::Primitive::Mesh(mesh) = primitive else {
                continue;
            };
            let Some(scissor) = scissor_rect(*clip_rect, pixels_per_point, screen_px) else {
                continue;
            };
            if mesh.indices.is_empty() {
                continue;
            }
            let first = indices.len() as u32;
            draws.push(DrawCall {
                texture: mesh.texture_id,
                scissor,
                indices: first..first + mesh.indices.len() as u32,
                base_vertex: vertices.len() as i32,
            });
            vertices.extend(mesh.vertices.iter().map(GuiVertex::from));
            indices.extend_from_slice(&mesh.indices);
        }
        if draws.is_empty() {
            return;
        }

        let screen = ScreenUniform {
            size_in_points: [
                screen_px[0] as f32 / pixels_per_point,
                screen_px[1] as f32 / pixels_per_point,
            ],
            _padding: [0.0; 2],
        };
        queue.write_buffer(&self.screen_buffer, 0, bytemuck::cast_slice(&[screen]));
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&indices);
        grow_stream_buffer(device, &mut self.vertex_buffer, wgpu::BufferUsages::VERTEX, vertex_bytes.len());
        grow_stream_buffer(device, &mut self.index_buffer, wgpu::BufferUsages::INDEX, index_bytes.len());
        queue.write_buffer(&self.vertex_buffer, 0, vertex_bytes);
        queue.write_buffer(&self.index_buffer, 0, index_bytes);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            multiview_mask: None,
            label: Some("Gui Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.screen_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..vertex_bytes.len() as u64));
        render_pass.set_index_buffer(
            self.index_buffer.slice(..index_bytes.len() as u64),
            wgpu::IndexFormat::Uint32,
        );
        for draw in draws {
            let Some(texture) = self.textures.get(&draw.texture) else {
                log::warn!("gui draw references unknown texture {:?}", draw.texture);
                continue;
            };
            let [x, y, w, h] = draw.scissor;
            render_pass.set_scissor_rect(x, y, w, h);
            render_pass.set_bind_group(1, &texture.bind_group, &[]);
            render_pass.draw_indexed(draw.indices, draw.base_vertex, 0..1);
        }
    }
}

fn mk_stream_buffer(device: &wgpu::Device, usage: wgpu::BufferUsages, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("gui stream buffer"),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn grow_stream_buffer(
    device: &wgpu::Device,
    buffer: &mut wgpu::Buffer,
    usage: wgpu::BufferUsages,
    needed: usize,
) {
    let needed = needed as u64;
    if buffer.size() < needed {
        *buffer = mk_stream_buffer(device, usage, needed.next_power_of_two());
    }
}

fn mk_texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("gui texture_bind_group_layout"),
    })
}

fn mk_render_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    render_pipeline_layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Gui Render Pipeline"),
        layout: Some(render_pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[GuiVertex::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
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
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
        cache: None,
    })
}
