//! Showroom lighting rig: ambient fill, a shadow-casting sun, a point fill light and a
//! shadow-casting spotlight aimed at the car.

use std::f32::consts::PI;

use cgmath::{Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3};

use crate::{camera::OPENGL_TO_WGPU_MATRIX, data_structures::scene_graph::Color};

/// Shadow map parameters shared by the sun and the spotlight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    /// Half width of the orthographic shadow frustum. Ignored by the spotlight.
    pub extent: f32,
    /// Added to the light-space depth before the comparison, negative values push the
    /// surface towards the light.
    pub bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: 1024,
            near: 1.0,
            far: 20.0,
            extent: 10.0,
            bias: -0.001,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub shadow: ShadowSettings,
}

impl DirectionalLight {
    /// Unit vector from the lit surface towards the light.
    pub fn direction(&self) -> Vector3<f32> {
        (self.position - self.target).normalize()
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        let view = Matrix4::look_at_rh(self.position, self.target, up_for(self.direction()));
        let e = self.shadow.extent;
        let proj = cgmath::ortho(-e, e, -e, e, self.shadow.near, self.shadow.far);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Point3<f32>,
    /// Range of the light. Zero means unlimited.
    pub distance: f32,
    pub decay: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    /// Half angle of the cone in radians.
    pub angle: f32,
    /// Fraction of the cone that fades out towards the edge.
    pub penumbra: f32,
    pub decay: f32,
    pub distance: f32,
    pub shadow: ShadowSettings,
}

impl SpotLight {
    /// Unit vector the cone points along.
    pub fn direction(&self) -> Vector3<f32> {
        let towards = self.target - self.position;
        if towards.magnitude2() > 0.0 {
            towards.normalize()
        } else {
            -Vector3::unit_y()
        }
    }

    /// Cosines of the outer cone and of the fully lit inner cone.
    pub fn cone_cosines(&self) -> (f32, f32) {
        let outer = self.angle.cos();
        let inner = (self.angle * (1.0 - self.penumbra)).cos();
        (outer, inner)
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        let direction = self.direction();
        let view = Matrix4::look_at_rh(self.position, self.position + direction, up_for(direction));
        // The shadow frustum covers the whole cone.
        let fovy = Rad((2.0 * self.angle).clamp(Rad::from(Deg(1.0)).0, PI - 0.01));
        let proj = cgmath::perspective(fovy, 1.0, self.shadow.near, self.shadow.far);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

/// `look_at` needs an up vector that is not parallel to the view direction.
fn up_for(direction: Vector3<f32>) -> Vector3<f32> {
    if direction.y.abs() > 0.99 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    }
}

/// Every light in the showroom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    pub point: PointLight,
    pub spot: SpotLight,
}

impl Default for Lights {
    fn default() -> Self {
        let white = Color::WHITE;
        Self {
            ambient: AmbientLight {
                color: white,
                intensity: 0.5,
            },
            directional: DirectionalLight {
                color: white,
                intensity: 0.8,
                position: Point3::new(5.0, 5.0, 5.0),
                target: Point3::origin(),
                shadow: ShadowSettings::default(),
            },
            point: PointLight {
                color: white,
                intensity: 0.3,
                position: Point3::new(-5.0, 3.0, -5.0),
                distance: 0.0,
                decay: 2.0,
            },
            spot: SpotLight {
                color: white,
                intensity: 0.7,
                position: Point3::new(0.0, 5.0, 0.0),
                target: Point3::origin(),
                angle: PI / 6.0,
                penumbra: 0.1,
                decay: 1.0,
                distance: 100.0,
                shadow: ShadowSettings::default(),
            },
        }
    }
}
