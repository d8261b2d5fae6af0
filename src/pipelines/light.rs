use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::{self, Texture},
    scene::lights::Lights,
};

/**
 * Every light of the showroom packed for mesh.wgsl.
 *
 * Uniforms need 16 byte alignment so scalars ride in the `w` of the vec4 next to them:
 * the sun's shadow bias in `dir_color.w`, point decay and range in the `w` of its position
 * and colour, spot range, decay and shadow bias in the `w` of its position, direction and
 * colour. `spot_cone` holds the cosines of the outer and inner cone.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    pub ambient: [f32; 4],
    pub dir_direction: [f32; 4],
    pub dir_color: [f32; 4],
    pub point_position: [f32; 4],
    pub point_color: [f32; 4],
    pub spot_position: [f32; 4],
    pub spot_direction: [f32; 4],
    pub spot_color: [f32; 4],
    pub spot_cone: [f32; 4],
    pub dir_view_proj: [[f32; 4]; 4],
    pub spot_view_proj: [[f32; 4]; 4],
}

impl LightsUniform {
    pub fn from_lights(lights: &Lights) -> Self {
        let with_w = |v: [f32; 3], w: f32| [v[0], v[1], v[2], w];
        let ambient = lights.ambient.color.scaled(lights.ambient.intensity);
        let sun = &lights.directional;
        let point = &lights.point;
        let spot = &lights.spot;
        let (outer, inner) = spot.cone_cosines();

        Self {
            ambient: with_w(ambient, 1.0),
            dir_direction: with_w(sun.direction().into(), 0.0),
            dir_color: with_w(sun.color.scaled(sun.intensity), sun.shadow.bias),
            point_position: with_w(point.position.into(), point.decay),
            point_color: with_w(point.color.scaled(point.intensity), point.distance),
            spot_position: with_w(spot.position.into(), spot.distance),
            spot_direction: with_w(spot.direction().into(), spot.decay),
            spot_color: with_w(spot.color.scaled(spot.intensity), spot.shadow.bias),
            spot_cone: [outer, inner, 0.0, 0.0],
            dir_view_proj: sun.view_proj().into(),
            spot_view_proj: spot.view_proj().into(),
        }
    }
}

/// Depth target plus the light-space matrix a shadow pass renders with.
#[derive(Debug)]
pub struct ShadowMap {
    pub texture: Texture,
    pub view_proj_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl ShadowMap {
    fn new(device: &wgpu::Device, size: u32, view_layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let texture = Texture::create_shadow_map(device, size, label);
        let view_proj_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[[[0.0f32; 4]; 4]]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: view_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_proj_buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self {
            texture,
            view_proj_buffer,
            bind_group,
        }
    }
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightsUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    /// Layout of the single light-space matrix the shadow pass binds at group 0.
    pub view_layout: wgpu::BindGroupLayout,
    pub directional_shadow: ShadowMap,
    pub spot_shadow: ShadowMap,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, lights: &Lights) -> Self {
        let uniform = LightsUniform::from_lights(lights);
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let view_layout = mk_view_layout(device);
        let directional_shadow = ShadowMap::new(
            device,
            lights.directional.shadow.map_size,
            &view_layout,
            "directional shadow map",
        );
        let spot_shadow =
            ShadowMap::new(device, lights.spot.shadow.map_size, &view_layout, "spot shadow map");
        let sampler = texture::create_shadow_sampler(device);
        let bind_group = mk_bind_group(
            device,
            &bind_group_layout,
            &buffer,
            &directional_shadow.texture,
            &spot_shadow.texture,
            &sampler,
        );

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
            view_layout,
            directional_shadow,
            spot_shadow,
        }
    }

    /// Upload the current light values and light-space matrices.
    pub fn update(&mut self, queue: &wgpu::Queue, lights: &Lights) {
        self.uniform = LightsUniform::from_lights(lights);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
        queue.write_buffer(
            &self.directional_shadow.view_proj_buffer,
            0,
            bytemuck::cast_slice(&[self.uniform.dir_view_proj]),
        );
        queue.write_buffer(
            &self.spot_shadow.view_proj_buffer,
            0,
            bytemuck::cast_slice(&[self.uniform.spot_view_proj]),
        );
    }
}

pub fn mk_buffer(device: &wgpu::Device, uniform: LightsUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Lights Buffer"),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

fn shadow_map_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Depth,
        },
        count: None,
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            shadow_map_entry(1),
            shadow_map_entry(2),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("lights_bind_group_layout"),
    })
}

pub fn mk_view_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        label: Some("light_view_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    directional_shadow: &Texture,
    spot_shadow: &Texture,
    sampler: &wgpu::Sampler,
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
                resource: wgpu::BindingResource::TextureView(&directional_shadow.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&spot_shadow.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("lights_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layout_is_uniform_aligned() {
        assert_eq!(std::mem::size_of::<LightsUniform>(), 272);
        assert_eq!(std::mem::size_of::<LightsUniform>() % 16, 0);
    }

    #[test]
    fn scalars_ride_in_the_w_lanes() {
        let lights = Lights::default();
        let uniform = LightsUniform::from_lights(&lights);
        assert_eq!(uniform.dir_color[3], lights.directional.shadow.bias);
        assert_eq!(uniform.point_position[3], 2.0);
        assert_eq!(uniform.spot_position[3], 100.0);
        assert_eq!(uniform.spot_direction[3], 1.0);
        assert!((uniform.ambient[0] - 0.5).abs() < 1e-6);
        assert!((uniform.spot_direction[1] + 1.0).abs() < 1e-6);
    }
}
