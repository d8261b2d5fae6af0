use showroom::{
    data_structures::scene_graph::{Color, SceneGraph},
    scene::classifier::{self, MaterialClass},
};

use crate::common::test_utils::{add_box, color_of, toy_car};

mod common;

#[test]
fn only_body_meshes_change_colour() {
    let mut graph = toy_car();
    let root = graph.root();
    let red = Color::from_hex(0xff0000);

    let painted = classifier::recolor(&mut graph, root, red);
    assert_eq!(painted, 2);

    let body = graph.find(root, "Body").unwrap();
    let chassis = graph.find(root, "Chassis").unwrap();
    let seat = graph.find(root, "Seat").unwrap();
    let wheel = graph.find(root, "Wheel").unwrap();
    assert_eq!(color_of(&graph, body), Some(red));
    assert_eq!(color_of(&graph, chassis), Some(red));
    assert_eq!(color_of(&graph, seat), Some(Color::WHITE));
    assert_eq!(color_of(&graph, wheel), Some(Color::WHITE));
}

#[test]
fn recolouring_twice_changes_nothing_more() {
    let mut graph = toy_car();
    let root = graph.root();
    let blue = Color::from_hex(0x0000ff);

    classifier::recolor(&mut graph, root, blue);
    let once = graph.clone();
    let painted = classifier::recolor(&mut graph, root, blue);
    assert_eq!(painted, 2);
    for id in graph.meshes(root) {
        assert_eq!(graph.node(id).as_mesh(), once.node(id).as_mesh());
    }
}

#[test]
fn upper_case_material_names_count_as_body() {
    let mut graph = SceneGraph::new("model");
    let root = graph.root();
    let panel = add_box(&mut graph, root, "door", "BODY_Panel", [0.0; 3], [1.0; 3]);
    assert_eq!(classifier::classify("BODY_Panel", "door"), MaterialClass::Body);

    let green = Color::from_hex(0x00ff00);
    assert_eq!(classifier::recolor(&mut graph, root, green), 1);
    assert_eq!(color_of(&graph, panel), Some(green));
}

#[test]
fn recolour_leaves_geometry_alone() {
    let mut graph = toy_car();
    let root = graph.root();
    let body = graph.find(root, "Body").unwrap();
    let before = graph.node(body).as_mesh().unwrap().geometry.clone();
    let metalness = graph.node(body).as_mesh().unwrap().material.as_ref().unwrap().metalness;

    classifier::recolor(&mut graph, root, Color::from_hex(0x123456));
    let mesh = graph.node(body).as_mesh().unwrap();
    assert_eq!(mesh.geometry, before);
    assert_eq!(mesh.material.as_ref().unwrap().metalness, metalness);
}
