//! Procedural geometry for the static parts of the showroom.

use crate::data_structures::scene_graph::Geometry;

/**
 * Axis-aligned box centred on the origin. Every face gets its own four vertices so the
 * normals stay flat, winding is counter-clockwise seen from outside.
 */
pub fn box_geometry(width: f32, height: f32, depth: f32) -> Geometry {
    let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
    // (normal, u axis, v axis) per face; corners are normal + (+-u) + (+-v)
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let half = [hx, hy, hz];

    let mut geometry = Geometry::default();
    for (normal, u, v) in faces {
        let base = geometry.positions.len() as u32;
        for (su, sv, uv) in [
            (-1.0, -1.0, [0.0, 1.0]),
            (1.0, -1.0, [1.0, 1.0]),
            (1.0, 1.0, [1.0, 0.0]),
            (-1.0, 1.0, [0.0, 0.0]),
        ] {
            let position = [0, 1, 2].map(|axis| (normal[axis] + su * u[axis] + sv * v[axis]) * half[axis]);
            geometry.positions.push(position);
            geometry.normals.push(normal);
            geometry.uvs.push(uv);
        }
        geometry
            .indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    geometry
}

/**
 * Plane in the XY plane facing +Z, the same orientation a ground plane has before it is
 * rotated to lie flat.
 */
pub fn plane_geometry(width: f32, height: f32) -> Geometry {
    let (hw, hh) = (width / 2.0, height / 2.0);
    Geometry {
        positions: vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        uvs: vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    #[test]
    fn box_spans_its_size() {
        let geometry = box_geometry(1.0, 2.0, 3.0);
        assert_eq!(geometry.positions.len(), 24);
        assert_eq!(geometry.indices.len(), 36);
        let size = geometry.local_bounds().size();
        assert_eq!(size, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn box_winding_matches_its_normals() {
        let geometry = box_geometry(1.0, 1.0, 1.0);
        let mut recomputed = geometry.clone();
        recomputed.compute_vertex_normals();
        for (given, computed) in geometry.normals.iter().zip(&recomputed.normals) {
            let dot = Vector3::from(*given).dot(Vector3::from(*computed));
            assert!(dot > 0.99, "{given:?} vs {computed:?}");
        }
    }

    #[test]
    fn plane_faces_positive_z() {
        let mut geometry = plane_geometry(10.0, 10.0);
        geometry.compute_vertex_normals();
        assert_eq!(geometry.normals, vec![[0.0, 0.0, 1.0]; 4]);
    }
}
