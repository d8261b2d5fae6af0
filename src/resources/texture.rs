use wgpu::util::DeviceExt;

use crate::data_structures::{
    scene_graph::{Material, Mesh},
    texture::Texture,
};

/**
 * Per-mesh material block. Field order matches `MaterialUniform` in mesh.wgsl.
 *
 * color.w flags a colour map, params = (metalness, roughness, receives shadow, double sided).
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub params: [f32; 4],
}

impl MaterialUniform {
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let fallback = Material::new("", crate::data_structures::scene_graph::Color::WHITE);
        let material = mesh.material.as_ref().unwrap_or(&fallback);
        let c = material.color;
        Self {
            color: [c.r, c.g, c.b, material.texture.map_or(0.0, |_| 1.0)],
            params: [
                material.metalness,
                material.roughness,
                if mesh.receive_shadow { 1.0 } else { 0.0 },
                if material.double_sided { 1.0 } else { 0.0 },
            ],
        }
    }
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
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
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
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
        label: Some("material_bind_group_layout"),
    })
}

pub fn mk_material_buffer(device: &wgpu::Device, uniform: MaterialUniform, label: &str) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Bind a material buffer together with its colour map. Textures without their own
/// sampler use `fallback_sampler`.
pub fn mk_material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    texture: &Texture,
    fallback_sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(
                    texture.sampler.as_ref().unwrap_or(fallback_sampler),
                ),
            },
        ],
        label: Some("material_bind_group"),
    })
}
