//! Perspective camera with damped orbit controls around a target point.

use std::f32::consts::{PI, TAU};

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector2, Vector3, perspective};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles so `look_at` stays well defined.
const POLAR_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new((10.0, 5.0, 10.0), Point3::origin())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    Rotate,
    Pan,
}

/// Orbit controls: left drag rotates around the target, right drag pans, the wheel zooms.
///
/// Rotation and panning are damped: each [`update`](OrbitController::update) applies a
/// `damping` fraction of the pending motion and keeps the rest for later frames.
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Pending (azimuth, polar) rotation in radians.
    rotate_delta: Vector2<f32>,
    /// Pending pan in viewport heights.
    pan_delta: Vector2<f32>,
    zoom_scale: f32,
    drag: Option<Drag>,
    cursor: Option<PhysicalPosition<f64>>,
    viewport_height: f32,
}

impl OrbitController {
    pub fn new(damping: f32) -> Self {
        Self {
            damping: damping.clamp(f32::EPSILON, 1.0),
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.5,
            max_distance: 500.0,
            rotate_delta: Vector2::new(0.0, 0.0),
            pan_delta: Vector2::new(0.0, 0.0),
            zoom_scale: 1.0,
            drag: None,
            cursor: None,
            viewport_height: 1.0,
        }
    }

    pub fn resize(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Rotate by a cursor motion of `dx`, `dy` pixels. A full viewport height is one turn.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let per_pixel = TAU * self.rotate_speed / self.viewport_height;
        self.rotate_delta.x -= dx * per_pixel;
        self.rotate_delta.y -= dy * per_pixel;
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pan_delta.x += dx / self.viewport_height;
        self.pan_delta.y += dy / self.viewport_height;
    }

    /// Positive steps move the camera towards the target.
    pub fn zoom(&mut self, steps: f32) {
        self.zoom_scale *= 0.95f32.powf(steps * self.zoom_speed);
    }

    /// Feed a window event. Returns true when the event moved the camera.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let drag = match button {
                    MouseButton::Left => Drag::Rotate,
                    MouseButton::Right | MouseButton::Middle => Drag::Pan,
                    _ => return false,
                };
                match state {
                    ElementState::Pressed => self.drag = Some(drag),
                    ElementState::Released if self.drag == Some(drag) => self.drag = None,
                    ElementState::Released => {}
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(*position);
                let (Some(drag), Some(previous)) = (self.drag, previous) else {
                    return false;
                };
                let dx = (position.x - previous.x) as f32;
                let dy = (position.y - previous.y) as f32;
                match drag {
                    Drag::Rotate => self.rotate(dx, dy),
                    Drag::Pan => self.pan(dx, dy),
                }
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                self.zoom(steps);
                true
            }
            _ => false,
        }
    }

    /// Apply the damped share of pending motion to `camera`.
    pub fn update(&mut self, camera: &mut Camera, projection: &Projection) {
        let offset = camera.position - camera.target;
        let mut radius = offset.magnitude();
        if radius <= f32::EPSILON {
            return;
        }
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        azimuth += self.rotate_delta.x * self.damping;
        polar = (polar + self.rotate_delta.y * self.damping).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        radius = (radius * self.zoom_scale).clamp(self.min_distance, self.max_distance);

        let forward = -offset.normalize();
        let right = forward.cross(Vector3::unit_y());
        if right.magnitude2() > f32::EPSILON {
            let right = right.normalize();
            let up = right.cross(forward);
            let view_height = 2.0 * radius * (projection.fovy().0 / 2.0).tan();
            let pan = self.pan_delta * self.damping * view_height;
            camera.target += -right * pan.x + up * pan.y;
        }

        let sin_polar = polar.sin();
        camera.position = camera.target
            + Vector3::new(
                radius * sin_polar * azimuth.sin(),
                radius * polar.cos(),
                radius * sin_polar * azimuth.cos(),
            );

        self.rotate_delta *= 1.0 - self.damping;
        self.pan_delta *= 1.0 - self.damping;
        self.zoom_scale = 1.0;
    }
}

/// The camera together with its controller and GPU uniform.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: Camera, projection: &Projection, damping: f32) -> Self {
        use wgpu::util::DeviceExt;

        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller: OrbitController::new(damping),
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Step the controller and upload the new view-projection.
    pub fn update(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.controller.update(&mut self.camera, projection);
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    fn projection() -> Projection {
        Projection::new(800, 600, Deg(75.0), 0.1, 1000.0)
    }

    #[test]
    fn idle_update_keeps_the_camera_still() {
        let mut camera = Camera::default();
        let mut controller = OrbitController::new(0.05);
        controller.update(&mut camera, &projection());
        assert!((camera.position - Point3::new(10.0, 5.0, 10.0)).magnitude() < 1e-4);
    }

    #[test]
    fn rotation_is_damped_and_keeps_distance() {
        let mut camera = Camera::default();
        let distance = camera.distance();
        let mut controller = OrbitController::new(0.05);
        controller.resize(600);
        controller.rotate(100.0, 0.0);

        controller.update(&mut camera, &projection());
        let first = camera.position;
        controller.update(&mut camera, &projection());
        let second = camera.position;

        assert!((camera.distance() - distance).abs() < 1e-3);
        let step_one = (first - Point3::new(10.0, 5.0, 10.0)).magnitude();
        let step_two = (second - first).magnitude();
        assert!(step_one > 0.0);
        assert!(step_two < step_one);
    }

    #[test]
    fn zoom_moves_towards_the_target() {
        let mut camera = Camera::default();
        let distance = camera.distance();
        let mut controller = OrbitController::new(0.05);
        controller.zoom(3.0);
        controller.update(&mut camera, &projection());
        assert!(camera.distance() < distance);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let mut camera = Camera::default();
        let mut controller = OrbitController::new(1.0);
        controller.resize(100);
        controller.rotate(0.0, 10_000.0);
        controller.update(&mut camera, &projection());
        assert!(camera.position.y > camera.target.y);
        assert!(camera.position.y.is_finite());
    }
}
