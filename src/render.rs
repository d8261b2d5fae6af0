//! Mirrors the scene graph onto the GPU and draws it.
//!
//! Every frame [`SceneRenderer::render`] uploads geometry for mesh nodes reachable from the
//! scene root the first time they show up and rewrites the world matrix and material
//! uniform of the others. Nodes that are no longer attached keep their buffers but are not
//! drawn. It then runs one depth pass per shadow casting light and the lit main pass.

use std::collections::HashMap;

use cgmath::SquareMatrix;
use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        model::{GpuMesh, interleave},
        scene_graph::{NodeId, SceneGraph},
        texture::{self, Texture},
        transform::InstanceRaw,
    },
    pipelines::light::ShadowMap,
    resources::texture::{MaterialUniform, mk_material_bind_group, mk_material_buffer},
    scene::lights::Lights,
};

struct DrawItem {
    node: NodeId,
    cast_shadow: bool,
}

#[derive(Debug)]
pub struct SceneRenderer {
    meshes: HashMap<NodeId, GpuMesh>,
    /// `None` marks textures that failed to upload.
    textures: HashMap<usize, Option<Texture>>,
    white: Texture,
    sampler: wgpu::Sampler,
}

impl SceneRenderer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            meshes: HashMap::new(),
            textures: HashMap::new(),
            white: Texture::create_solid(device, queue, [255, 255, 255, 255], "white texture"),
            sampler: texture::create_default_sampler(device),
        }
    }

    /// Upload new meshes and textures and refresh transforms and materials.
    /// Returns what to draw this frame.
    fn sync(&mut self, ctx: &Context, graph: &SceneGraph) -> Vec<DrawItem> {
        let mut items = Vec::new();
        let mut reachable = Vec::new();
        graph.visit_world(graph.root(), cgmath::Matrix4::identity(), |id, node, world| {
            if let Some(mesh) = node.as_mesh() {
                reachable.push((id, *world, mesh.cast_shadow));
            }
        });

        for (id, world, cast_shadow) in reachable {
            let Some(mesh) = graph.node(id).as_mesh() else {
                continue;
            };
            if mesh.geometry.positions.is_empty() || mesh.geometry.indices.is_empty() {
                continue;
            }
            let mut texture_index = mesh.material.as_ref().and_then(|m| m.texture);
            if let Some(index) = texture_index {
                self.ensure_texture(ctx, graph, index);
            }
            // Textures that failed to upload fall back to white.
            texture_index = texture_index.filter(|index| self.texture(*index).is_some());

            let uniform = MaterialUniform::from_mesh(mesh);
            let instance = InstanceRaw::from_world(&world);
            let stale = self
                .meshes
                .get(&id)
                .is_some_and(|gpu| gpu.texture != texture_index);
            if stale {
                self.meshes.remove(&id);
            }
            match self.meshes.get(&id) {
                Some(gpu) => {
                    ctx.queue
                        .write_buffer(&gpu.instance_buffer, 0, bytemuck::cast_slice(&[instance]));
                    ctx.queue
                        .write_buffer(&gpu.material_buffer, 0, bytemuck::cast_slice(&[uniform]));
                }
                None => {
                    let gpu = self.upload(ctx, graph, id, instance, uniform, texture_index);
                    self.meshes.insert(id, gpu);
                }
            }
            items.push(DrawItem {
                node: id,
                cast_shadow,
            });
        }
        items
    }

    fn texture(&self, index: usize) -> Option<&Texture> {
        self.textures.get(&index).and_then(Option::as_ref)
    }

    fn ensure_texture(&mut self, ctx: &Context, graph: &SceneGraph, index: usize) {
        if self.textures.contains_key(&index) {
            return;
        }
        let Some(image) = graph.images.get(index) else {
            log::warn!("material references missing texture {index}");
            self.textures.insert(index, None);
            return;
        };
        let texture = Texture::from_image(&ctx.device, &ctx.queue, image, Some("material texture"))
            .inspect_err(|e| log::warn!("texture {index} not uploaded: {e:#}"))
            .ok();
        self.textures.insert(index, texture);
    }

    fn upload(
        &self,
        ctx: &Context,
        graph: &SceneGraph,
        id: NodeId,
        instance: InstanceRaw,
        uniform: MaterialUniform,
        texture_index: Option<usize>,
    ) -> GpuMesh {
        let node = graph.node(id);
        let vertices = node.as_mesh().map(|m| interleave(&m.geometry)).unwrap_or_default();
        let indices = node
            .as_mesh()
            .map(|m| m.geometry.indices.clone())
            .unwrap_or_default();
        log::debug!("uploading mesh {:?} ({} vertices)", node.name, vertices.len());

        let vertex_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", node.name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", node.name)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Instance Buffer", node.name)),
            contents: bytemuck::cast_slice(&[instance]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let material_buffer = mk_material_buffer(&ctx.device, uniform, &format!("{} Material", node.name));
        let texture = texture_index
            .and_then(|index| self.texture(index))
            .unwrap_or(&self.white);
        let material_bind_group = mk_material_bind_group(
            &ctx.device,
            &ctx.material_layout,
            &material_buffer,
            texture,
            &self.sampler,
        );

        GpuMesh {
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            instance_buffer,
            material_buffer,
            material_bind_group,
            texture: texture_index,
        }
    }

    /// Shadow passes and the main pass for the current state of `graph`.
    pub fn render(
        &mut self,
        ctx: &mut Context,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        graph: &SceneGraph,
        lights: &Lights,
    ) {
        ctx.light.update(&ctx.queue, lights);
        let ctx = &*ctx;
        let items = self.sync(ctx, graph);

        for shadow in [&ctx.light.directional_shadow, &ctx.light.spot_shadow] {
            self.shadow_pass(ctx, encoder, shadow, &items);
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            multiview_mask: None,
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &ctx.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&ctx.pipelines.mesh);
        render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        render_pass.set_bind_group(1, &ctx.light.bind_group, &[]);
        for item in &items {
            let Some(gpu) = self.meshes.get(&item.node) else {
                continue;
            };
            render_pass.set_bind_group(2, &gpu.material_bind_group, &[]);
            draw_mesh(&mut render_pass, gpu);
        }
    }

    fn shadow_pass(
        &self,
        ctx: &Context,
        encoder: &mut wgpu::CommandEncoder,
        shadow: &ShadowMap,
        items: &[DrawItem],
    ) {
        let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            multiview_mask: None,
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &shadow.texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        shadow_pass.set_pipeline(&ctx.pipelines.shadow);
        shadow_pass.set_bind_group(0, &shadow.bind_group, &[]);
        for item in items.iter().filter(|item| item.cast_shadow) {
            if let Some(gpu) = self.meshes.get(&item.node) {
                draw_mesh(&mut shadow_pass, gpu);
            }
        }
    }
}

fn draw_mesh(render_pass: &mut wgpu::RenderPass<'_>, gpu: &GpuMesh) {
    render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
    render_pass.set_vertex_buffer(1, gpu.instance_buffer.slice(..));
    render_pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    render_pass.draw_indexed(0..gpu.num_elements, 0, 0..1);
}
