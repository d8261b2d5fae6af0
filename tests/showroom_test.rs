use std::f32::consts::FRAC_PI_2;

use cgmath::Point3;
use showroom::{
    config::ViewerConfig,
    data_structures::scene_graph::{Color, NodeId, SceneGraph},
    gui::{labels::Locale, panel::ControlPanel},
    resources::{LoadProgress, decode_gltf},
    scene::composer::{LoadStatus, ModelSlot, Param, Showroom, Value},
};

use crate::common::test_utils::{car_asset, color_of, toy_car};

mod common;

fn attached_slots(showroom: &Showroom, placeholder: NodeId) -> usize {
    let graph = showroom.graph();
    let model_attached = showroom.model().is_some_and(|id| graph.is_attached(id));
    usize::from(graph.is_attached(placeholder)) + usize::from(model_attached)
}

fn placeholder_of(showroom: &Showroom) -> NodeId {
    match showroom.slot() {
        ModelSlot::Placeholder(id) => id,
        ModelSlot::Loaded(_) => panic!("model already attached"),
    }
}

#[test]
fn model_replaces_the_placeholder() {
    let mut showroom = Showroom::new(&ViewerConfig::default());
    let placeholder = placeholder_of(&showroom);
    assert_eq!(attached_slots(&showroom, placeholder), 1);

    showroom.attach_model(toy_car()).unwrap();
    let model = showroom.model().unwrap();
    assert_eq!(attached_slots(&showroom, placeholder), 1);
    assert!(!showroom.graph().is_attached(placeholder));
    assert_eq!(*showroom.status(), LoadStatus::Ready);

    let bounds = showroom.graph().world_bounds(model);
    assert!((bounds.max_dimension() - 2.0).abs() < 1e-5);
    assert!(bounds.min.y.abs() < 1e-5);
}

#[test]
fn spotlight_moves_over_the_model() {
    let mut showroom = Showroom::new(&ViewerConfig::default());
    showroom.attach_model(toy_car()).unwrap();
    let model = showroom.model().unwrap();
    assert_eq!(showroom.lights.spot.position, Point3::new(0.0, 10.0, 0.0));
    assert_eq!(showroom.lights.spot.target, showroom.graph().world_position(model));

    assert!(showroom.set(Param::ModelHeight, Value::Number(1.5)));
    showroom.tick();
    assert!((showroom.lights.spot.target.y - 1.5).abs() < 1e-6);
}

#[test]
fn body_is_painted_in_the_configured_colour() {
    let config = ViewerConfig {
        body_color: Color::from_hex(0x00ff00),
        ..ViewerConfig::default()
    };
    let mut showroom = Showroom::new(&config);
    showroom.attach_model(toy_car()).unwrap();
    let model = showroom.model().unwrap();
    let graph = showroom.graph();
    let body = graph.find(model, "Body").unwrap();
    let seat = graph.find(model, "Seat").unwrap();
    assert_eq!(color_of(graph, body), Some(Color::from_hex(0x00ff00)));
    assert_eq!(color_of(graph, seat), Some(Color::WHITE));
}

#[test]
fn colour_picked_before_the_load_applies_afterwards() {
    let mut showroom = Showroom::new(&ViewerConfig::default());
    let blue = Color::from_hex(0x0000ff);
    assert!(showroom.set(Param::BodyColor, Value::Color(blue)));
    showroom.attach_model(toy_car()).unwrap();

    let model = showroom.model().unwrap();
    let body = showroom.graph().find(model, "Body").unwrap();
    assert_eq!(color_of(showroom.graph(), body), Some(blue));

    let yellow = Color::from_hex(0xffff00);
    showroom.set_body_color(yellow);
    assert_eq!(color_of(showroom.graph(), body), Some(yellow));
    assert_eq!(showroom.get(Param::BodyColor), Some(Value::Color(yellow)));
}

#[test]
fn auto_rotation_needs_a_model_and_the_toggle() {
    let mut showroom = Showroom::new(&ViewerConfig::default());
    let placeholder = placeholder_of(&showroom);
    let before = showroom.graph().node(placeholder).transform;
    showroom.tick();
    assert_eq!(showroom.graph().node(placeholder).transform, before);

    showroom.attach_model(toy_car()).unwrap();
    showroom.tick();
    let Some(Value::Number(yaw)) = showroom.get(Param::ModelRotationY) else {
        panic!("rotation should be readable");
    };
    assert!((yaw - 0.005).abs() < 1e-6);

    assert!(showroom.set(Param::AutoRotateEnabled, Value::Flag(false)));
    showroom.tick();
    assert_eq!(showroom.get(Param::ModelRotationY), Some(Value::Number(yaw)));
}

#[test]
fn failed_attach_keeps_the_placeholder() {
    let mut showroom = Showroom::new(&ViewerConfig::default());
    let placeholder = placeholder_of(&showroom);
    assert!(showroom.attach_model(SceneGraph::new("hollow")).is_err());
    assert!(showroom.graph().is_attached(placeholder));
    assert_eq!(attached_slots(&showroom, placeholder), 1);
    assert!(matches!(showroom.status(), LoadStatus::Failed(_)));
}

#[test]
fn a_second_model_replaces_the_first() {
    let mut showroom = Showroom::new(&ViewerConfig::default());
    showroom.attach_model(toy_car()).unwrap();
    let first = showroom.model().unwrap();

    let path = car_asset();
    let demo = decode_gltf(&std::fs::read(&path).unwrap(), &path).unwrap();
    showroom.attach_model(demo).unwrap();
    let second = showroom.model().unwrap();

    assert_ne!(first, second);
    assert!(!showroom.graph().is_attached(first));
    assert!(showroom.graph().is_attached(second));
}

#[test]
fn progress_after_ready_is_ignored() {
    let mut showroom = Showroom::new(&ViewerConfig::default());
    showroom.record_progress(LoadProgress { loaded: 1, total: 4 });
    assert_eq!(showroom.status().fraction(), Some(0.25));
    showroom.attach_model(toy_car()).unwrap();
    showroom.record_progress(LoadProgress { loaded: 2, total: 4 });
    assert_eq!(*showroom.status(), LoadStatus::Ready);
}

#[test]
fn panel_values_are_clamped_before_they_reach_the_scene() {
    let panel = ControlPanel::new(Locale::English);
    let mut showroom = Showroom::new(&ViewerConfig::default());
    assert!(!panel.apply(&mut showroom, Param::ModelScaleX, Value::Number(1.0)));

    showroom.attach_model(toy_car()).unwrap();
    assert!(panel.apply(&mut showroom, Param::ModelScaleX, Value::Number(9.0)));
    assert_eq!(showroom.get(Param::ModelScaleX), Some(Value::Number(2.0)));
    assert!(panel.apply(&mut showroom, Param::SpotAngle, Value::Number(3.0)));
    assert_eq!(showroom.get(Param::SpotAngle), Some(Value::Number(FRAC_PI_2)));
    assert!(panel.apply(&mut showroom, Param::DirectionalShadowBias, Value::Number(-0.5)));
    assert_eq!(showroom.get(Param::DirectionalShadowBias), Some(Value::Number(-0.01)));
    assert!(!panel.apply(&mut showroom, Param::SpotIntensity, Value::Flag(true)));
}
