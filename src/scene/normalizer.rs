//! Fit an arbitrary model into the showroom.
//!
//! A model is scaled uniformly so that its largest world-space extent becomes
//! [`TARGET_SIZE`] and lifted so that its lowest point rests on `y = 0`.

use cgmath::Vector3;

use crate::data_structures::scene_graph::{NodeId, SceneGraph};

/// Largest extent of a normalized model, in world units.
pub const TARGET_SIZE: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizationTransform {
    pub scale: f32,
    pub y_offset: f32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("model has no vertices to measure")]
    Empty,
    #[error("model bounds {size:?} have no usable extent")]
    Degenerate { size: Vector3<f32> },
}

/// Normalize `root` to [`TARGET_SIZE`].
pub fn normalize(
    graph: &mut SceneGraph,
    root: NodeId,
) -> Result<NormalizationTransform, NormalizeError> {
    normalize_to(graph, root, TARGET_SIZE)
}

/// Scale `root` so its largest extent is `target_size` and put its lowest point on `y = 0`.
///
/// The box is measured with `root`'s own transform and no parent. The scale multiplies the
/// existing root scale and the root's `y` position is replaced by `-box.min.y * scale`.
/// Nothing is mutated on error.
pub fn normalize_to(
    graph: &mut SceneGraph,
    root: NodeId,
    target_size: f32,
) -> Result<NormalizationTransform, NormalizeError> {
    let bounds = graph.world_bounds(root);
    if bounds.is_empty() {
        return Err(NormalizeError::Empty);
    }
    let size = bounds.size();
    let max_dimension = bounds.max_dimension();
    if !max_dimension.is_finite() || max_dimension <= 0.0 {
        return Err(NormalizeError::Degenerate { size });
    }

    let scale = target_size / max_dimension;
    if !scale.is_finite() {
        return Err(NormalizeError::Degenerate { size });
    }
    let y_offset = -bounds.min.y * scale;

    let transform = &mut graph.node_mut(root).transform;
    transform.scale_uniformly(scale);
    transform.position.y = y_offset;

    log::debug!("normalized model: size {size:?}, scale {scale}, y offset {y_offset}");
    Ok(NormalizationTransform { scale, y_offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::scene_graph::{Color, Geometry, Material, Mesh, Node};

    fn model_with(positions: Vec<[f32; 3]>) -> SceneGraph {
        let mut graph = SceneGraph::new("model");
        let indices = (0..positions.len() as u32).collect();
        graph.add(
            graph.root(),
            Node::mesh(
                "body",
                Mesh::new(
                    Geometry {
                        positions,
                        indices,
                        ..Default::default()
                    },
                    Material::new("paint", Color::WHITE),
                ),
            ),
        );
        graph
    }

    #[test]
    fn scales_the_largest_extent_to_two() {
        let mut graph = model_with(vec![[-1.0, -1.0, -1.0], [3.0, 1.0, 1.0], [0.0, 0.0, 0.0]]);
        let root = graph.root();
        let result = normalize(&mut graph, root).unwrap();
        assert_eq!(result.scale, 0.5);
        assert_eq!(result.y_offset, 0.5);

        let bounds = graph.world_bounds(root);
        assert!((bounds.max_dimension() - TARGET_SIZE).abs() < 1e-5);
        assert!(bounds.min.y.abs() < 1e-5);
    }

    #[test]
    fn multiplies_an_existing_root_scale() {
        let mut graph = model_with(vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 0.0]]);
        let root = graph.root();
        graph.node_mut(root).transform.scale = Vector3::new(4.0, 4.0, 4.0);
        let result = normalize(&mut graph, root).unwrap();
        assert_eq!(result.scale, 0.5);
        assert_eq!(graph.node(root).transform.scale, Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn flat_models_still_normalize() {
        let mut graph = model_with(vec![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 0.0, 4.0]]);
        let root = graph.root();
        let result = normalize(&mut graph, root).unwrap();
        assert_eq!(result.scale, 0.5);
        assert_eq!(result.y_offset, 0.0);
    }

    #[test]
    fn a_single_point_is_degenerate() {
        let mut graph = model_with(vec![[1.0, 1.0, 1.0]; 3]);
        let root = graph.root();
        let before = graph.node(root).transform;
        let err = normalize(&mut graph, root).unwrap_err();
        assert!(matches!(err, NormalizeError::Degenerate { .. }));
        assert_eq!(graph.node(root).transform, before);
    }

    #[test]
    fn groups_without_meshes_are_empty() {
        let mut graph = SceneGraph::new("model");
        let root = graph.root();
        assert_eq!(normalize(&mut graph, root), Err(NormalizeError::Empty));
    }

    #[test]
    fn non_finite_vertices_are_rejected() {
        let mut graph = model_with(vec![[0.0, 0.0, 0.0], [f32::INFINITY, 1.0, 1.0], [0.0; 3]]);
        let root = graph.root();
        let err = normalize(&mut graph, root).unwrap_err();
        assert!(matches!(err, NormalizeError::Degenerate { .. }));
    }
}
