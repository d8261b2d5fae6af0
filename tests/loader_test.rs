use std::{path::Path, time::Duration};

use showroom::resources::{self, LoadError, LoadProgress, PendingLoad};

use crate::common::test_utils::{boxes_glb, car_asset, draco_glb, write_fixture};

mod common;

#[tokio::test]
async fn progress_only_grows_and_finishes_complete() {
    let path = car_asset();
    let mut reports: Vec<LoadProgress> = Vec::new();
    let graph = resources::load_model_gltf(&path, |progress| reports.push(progress))
        .await
        .unwrap();
    assert!(!graph.meshes(graph.root()).is_empty());

    assert!(!reports.is_empty());
    for pair in reports.windows(2) {
        assert!(pair[1].loaded >= pair[0].loaded, "{reports:?}");
    }
    let last = reports.last().unwrap();
    assert_eq!(last.loaded, last.total);
    assert_eq!(last.total, std::fs::metadata(&path).unwrap().len());
    assert_eq!(last.fraction(), 1.0);
}

#[tokio::test]
async fn demo_car_has_named_parts() {
    let graph = resources::load_model_gltf(&car_asset(), |_| {}).await.unwrap();
    let root = graph.root();
    for name in ["Body", "Chassis", "Seat", "Wheel_0"] {
        let id = graph.find(root, name).unwrap_or_else(|| panic!("{name} missing"));
        assert!(graph.node(id).as_mesh().is_some(), "{name} is not a mesh");
    }
    let seat = graph.find(root, "Seat").unwrap();
    let material = graph.node(seat).as_mesh().unwrap().material.as_ref().unwrap();
    assert_eq!(material.name, "interior_seat");
}

#[tokio::test]
async fn box_fixture_decodes_with_its_names() {
    let path = write_fixture(
        "glb",
        &boxes_glb(&[
            ("Door", "BODY_Panel", [0.0, 0.0, 0.0], [1.0, 2.0, 0.1]),
            ("Dash", "", [0.0, 0.0, 0.0], [0.5, 0.5, 0.5]),
        ]),
    );
    let graph = resources::load_model_gltf(&path, |_| {}).await.unwrap();
    let root = graph.root();

    let door = graph.find(root, "Door").unwrap();
    let mesh = graph.node(door).as_mesh().unwrap();
    assert_eq!(mesh.material.as_ref().unwrap().name, "BODY_Panel");
    assert_eq!(mesh.geometry.indices.len(), 36);
    let bounds = graph.world_bounds(door);
    assert!((bounds.size().y - 2.0).abs() < 1e-6);

    let dash = graph.find(root, "Dash").unwrap();
    assert_eq!(graph.node(dash).as_mesh().unwrap().material.as_ref().unwrap().name, "");
}

#[tokio::test]
async fn missing_files_are_io_errors() {
    let missing = Path::new("/definitely/not/here/car.glb");
    let err = resources::load_model_gltf(missing, |_| {}).await.unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }), "{err}");
}

#[tokio::test]
async fn draco_is_reported_by_name() {
    let path = write_fixture("glb", &draco_glb());
    let err = resources::load_model_gltf(&path, |_| {}).await.unwrap_err();
    match err {
        LoadError::UnsupportedExtension { extension, .. } => {
            assert_eq!(extension, "KHR_draco_mesh_compression")
        }
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test]
async fn garbage_is_a_decode_error() {
    let path = write_fixture("glb", b"this is not a model at all");
    let err = resources::load_model_gltf(&path, |_| {}).await.unwrap_err();
    assert!(matches!(err, LoadError::Decode { .. }), "{err}");
}

#[test]
fn documents_without_scenes_are_rejected() {
    let json = br#"{"asset":{"version":"2.0"}}"#;
    let err = resources::decode_gltf(json, Path::new("empty.gltf")).unwrap_err();
    assert!(matches!(err, LoadError::EmptyScene { .. }), "{err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pending_load_delivers_progress_then_the_model() {
    let mut pending = PendingLoad::spawn(&tokio::runtime::Handle::current(), car_asset());
    let mut progress = Vec::new();
    let mut outcome = None;
    for _ in 0..500 {
        progress.extend(pending.drain_progress());
        if let Some(result) = pending.poll_outcome() {
            outcome = Some(result);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    progress.extend(pending.drain_progress());

    let graph = outcome.expect("load did not finish").unwrap();
    assert!(pending.is_finished());
    assert!(pending.poll_outcome().is_none());
    assert!(graph.find(graph.root(), "Body").is_some());
    let last = progress.last().unwrap();
    assert_eq!(last.loaded, last.total);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pending_load_reports_failures() {
    let mut pending = PendingLoad::spawn(
        &tokio::runtime::Handle::current(),
        "/definitely/not/here/car.glb".into(),
    );
    let mut outcome = None;
    for _ in 0..500 {
        if let Some(result) = pending.poll_outcome() {
            outcome = Some(result);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(matches!(outcome, Some(Err(LoadError::Io { .. }))));
}

#[test]
fn asset_paths_resolve_next_to_the_crate() {
    let absolute = car_asset();
    assert_eq!(resources::resolve_asset_path(&absolute), absolute);
    let resolved = resources::resolve_asset_path(Path::new("models/car.glb"));
    assert!(resolved.ends_with("models/car.glb"));
}
