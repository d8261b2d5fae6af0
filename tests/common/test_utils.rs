use std::{
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use showroom::{
    data_structures::{
        scene_graph::{Color, Geometry, Material, Mesh, Node, NodeId, SceneGraph},
        transform::Transform,
    },
    resources::mesh::box_geometry,
};

static FIXTURE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// The demo car shipped with the crate.
pub fn car_asset() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("assets")
        .join("models")
        .join("car.glb")
}

/// Write `bytes` to a fresh file in the temp directory and return its path.
pub fn write_fixture(extension: &str, bytes: &[u8]) -> PathBuf {
    let n = FIXTURE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "showroom-fixture-{}-{n}.{extension}",
        std::process::id()
    ));
    std::fs::write(&path, bytes).expect("failed to write fixture");
    path
}

/// Wrap a JSON document and an optional binary chunk into a GLB container.
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let bin_chunk = if bin.is_empty() { 0 } else { 8 + bin.len() };
    let total = 12 + 8 + json.len() + bin_chunk;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    out.extend_from_slice(&json);
    if !bin.is_empty() {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
        out.extend_from_slice(&bin);
    }
    out
}

/// A GLB with one box mesh per part. Parts are `(node name, material name, min, max)`;
/// an empty material name leaves the material unnamed.
pub fn boxes_glb(parts: &[(&str, &str, [f32; 3], [f32; 3])]) -> Vec<u8> {
    let mut bin: Vec<u8> = Vec::new();
    let mut views = Vec::new();
    let mut accessors = Vec::new();
    let mut materials = Vec::new();
    let mut meshes = Vec::new();
    let mut nodes = Vec::new();

    for (i, (name, material, min, max)) in parts.iter().enumerate() {
        let geometry = cuboid(*min, *max);
        let positions: &[u8] = bytemuck::cast_slice(&geometry.positions);
        let indices: &[u8] = bytemuck::cast_slice(&geometry.indices);

        views.push(format!(
            r#"{{"buffer":0,"byteOffset":{},"byteLength":{}}}"#,
            bin.len(),
            positions.len()
        ));
        bin.extend_from_slice(positions);
        views.push(format!(
            r#"{{"buffer":0,"byteOffset":{},"byteLength":{}}}"#,
            bin.len(),
            indices.len()
        ));
        bin.extend_from_slice(indices);

        accessors.push(format!(
            r#"{{"bufferView":{},"componentType":5126,"count":{},"type":"VEC3","min":[{},{},{}],"max":[{},{},{}]}}"#,
            2 * i,
            geometry.positions.len(),
            min[0], min[1], min[2], max[0], max[1], max[2]
        ));
        accessors.push(format!(
            r#"{{"bufferView":{},"componentType":5125,"count":{},"type":"SCALAR"}}"#,
            2 * i + 1,
            geometry.indices.len()
        ));
        materials.push(if material.is_empty() {
            r#"{"pbrMetallicRoughness":{"baseColorFactor":[1,1,1,1]}}"#.to_string()
        } else {
            format!(r#"{{"name":"{material}","pbrMetallicRoughness":{{"baseColorFactor":[1,1,1,1]}}}}"#)
        });
        meshes.push(format!(
            r#"{{"name":"{name}","primitives":[{{"attributes":{{"POSITION":{}}},"indices":{},"material":{i}}}]}}"#,
            2 * i,
            2 * i + 1
        ));
        nodes.push(format!(r#"{{"name":"{name}","mesh":{i}}}"#));
    }
    let node_ids: Vec<String> = (0..parts.len()).map(|i| i.to_string()).collect();
    let json = format!(
        r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[{}]}}],"nodes":[{}],"meshes":[{}],"materials":[{}],"accessors":[{}],"bufferViews":[{}],"buffers":[{{"byteLength":{}}}]}}"#,
        node_ids.join(","),
        nodes.join(","),
        meshes.join(","),
        materials.join(","),
        accessors.join(","),
        views.join(","),
        bin.len()
    );
    glb(&json, &bin)
}

/// A GLB that asks for Draco mesh compression.
pub fn draco_glb() -> Vec<u8> {
    glb(
        r#"{"asset":{"version":"2.0"},"extensionsUsed":["KHR_draco_mesh_compression"],"extensionsRequired":["KHR_draco_mesh_compression"],"scenes":[{"nodes":[]}]}"#,
        &[],
    )
}

/// Box geometry spanning `min..max`.
pub fn cuboid(min: [f32; 3], max: [f32; 3]) -> Geometry {
    let size = [0, 1, 2].map(|axis| max[axis] - min[axis]);
    let center = [0, 1, 2].map(|axis| (max[axis] + min[axis]) / 2.0);
    let mut geometry = box_geometry(size[0], size[1], size[2]);
    for position in &mut geometry.positions {
        for axis in 0..3 {
            position[axis] += center[axis];
        }
    }
    geometry
}

/// Add a box mesh node below `parent`.
pub fn add_box(
    graph: &mut SceneGraph,
    parent: NodeId,
    name: &str,
    material: &str,
    min: [f32; 3],
    max: [f32; 3],
) -> NodeId {
    let mesh = Mesh::new(cuboid(min, max), Material::new(material, Color::WHITE));
    graph.add(parent, Node::mesh(name, mesh).with_transform(Transform::new()))
}

/// A little car: painted body, unnamed chassis, seat and a wheel.
pub fn toy_car() -> SceneGraph {
    let mut graph = SceneGraph::new("toy car");
    let root = graph.root();
    add_box(&mut graph, root, "Body", "car_paint_body", [-2.0, 0.5, -0.9], [2.0, 1.3, 0.9]);
    add_box(&mut graph, root, "Chassis", "", [-1.9, 0.3, -0.8], [1.9, 0.5, 0.8]);
    add_box(&mut graph, root, "Seat", "interior_seat", [-0.5, 1.0, 0.2], [0.1, 1.4, 0.7]);
    add_box(&mut graph, root, "Wheel", "tyre_rubber", [1.0, 0.0, 0.7], [1.6, 0.6, 1.0]);
    graph
}

pub fn color_of(graph: &SceneGraph, id: NodeId) -> Option<Color> {
    graph
        .node(id)
        .as_mesh()
        .and_then(|mesh| mesh.material.as_ref())
        .map(|material| material.color)
}
