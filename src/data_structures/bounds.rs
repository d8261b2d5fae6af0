//! Axis-aligned bounding boxes.

use cgmath::{Matrix4, Point3, Transform as _, Vector3};

/// World-space box spanned by a set of points.
///
/// A fresh box is empty (`min > max` on every axis) until the first point is added.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        let mut aabb = Self::empty();
        points.into_iter().for_each(|p| aabb.expand(p));
        aabb
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, point: Point3<f32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Add the eight corners of `other` after transforming them by `matrix`.
    pub fn expand_transformed(&mut self, other: &Aabb, matrix: &Matrix4<f32>) {
        if other.is_empty() {
            return;
        }
        for i in 0..8 {
            let corner = Point3::new(
                if i & 1 == 0 { other.min.x } else { other.max.x },
                if i & 2 == 0 { other.min.y } else { other.max.y },
                if i & 4 == 0 { other.min.z } else { other.max.z },
            );
            self.expand(matrix.transform_point(corner));
        }
    }

    /// Extent per axis. Zero for an empty box.
    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        self.max - self.min
    }

    pub fn max_dimension(&self) -> f32 {
        let size = self.size();
        size.x.max(size.y).max(size.z)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
