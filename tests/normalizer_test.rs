use cgmath::Vector3;
use showroom::{
    data_structures::scene_graph::SceneGraph,
    resources::decode_gltf,
    scene::normalizer::{self, NormalizeError, TARGET_SIZE},
};

use crate::common::test_utils::{add_box, car_asset, toy_car};

mod common;

#[test]
fn off_centre_box_lands_on_the_floor() {
    let mut graph = SceneGraph::new("model");
    let root = graph.root();
    add_box(&mut graph, root, "crate", "wood", [-1.0, -1.0, -1.0], [3.0, 1.0, 1.0]);

    let result = normalizer::normalize(&mut graph, root).unwrap();
    assert_eq!(result.scale, 0.5);
    assert_eq!(result.y_offset, 0.5);

    let bounds = graph.world_bounds(root);
    assert!((bounds.max_dimension() - 2.0).abs() < 1e-5);
    assert!(bounds.min.y.abs() < 1e-5);
}

#[test]
fn nested_transforms_are_measured() {
    let mut graph = SceneGraph::new("model");
    let root = graph.root();
    let child = add_box(&mut graph, root, "panel", "paint", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    graph.node_mut(child).transform.scale = Vector3::new(8.0, 1.0, 1.0);
    graph.node_mut(child).transform.position = Vector3::new(0.0, 3.0, 0.0);

    let result = normalizer::normalize_to(&mut graph, root, 4.0).unwrap();
    assert_eq!(result.scale, 0.5);
    assert!((result.y_offset + 1.5).abs() < 1e-5);
    assert!(graph.world_bounds(root).min.y.abs() < 1e-5);
}

#[test]
fn toy_car_fits_the_target() {
    let mut graph = toy_car();
    let root = graph.root();
    normalizer::normalize(&mut graph, root).unwrap();
    let bounds = graph.world_bounds(root);
    assert!((bounds.max_dimension() - TARGET_SIZE).abs() < 1e-5);
    assert!(bounds.min.y.abs() < 1e-5);
}

#[test]
fn demo_car_asset_normalizes() {
    let path = car_asset();
    let bytes = std::fs::read(&path).unwrap();
    let mut graph = decode_gltf(&bytes, &path).unwrap();
    let root = graph.root();
    let result = normalizer::normalize(&mut graph, root).unwrap();
    assert!((result.scale - 0.5).abs() < 1e-5);

    let bounds = graph.world_bounds(root);
    assert!((bounds.max_dimension() - TARGET_SIZE).abs() < 1e-4);
    assert!(bounds.min.y.abs() < 1e-4);
}

#[test]
fn empty_models_are_left_alone() {
    let mut graph = SceneGraph::new("nothing");
    let root = graph.root();
    let before = graph.node(root).transform;
    assert_eq!(normalizer::normalize(&mut graph, root), Err(NormalizeError::Empty));
    assert_eq!(graph.node(root).transform, before);
}
