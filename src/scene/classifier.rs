//! Body-panel detection and recolouring.
//!
//! A mesh counts as car body when its material name (or, for unnamed materials, its node
//! name) contains one of [`BODY_KEYWORDS`], ignoring case. Nothing is cached: every
//! [`recolor`] call classifies the meshes again, so renamed materials are picked up.

use crate::data_structures::scene_graph::{Color, NodeId, SceneGraph};

pub const BODY_KEYWORDS: [&str; 5] = ["body", "exterior", "outside", "car_body", "chassis"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialClass {
    Body,
    Other,
}

/// Lowercased material name, or the lowercased node name when the material has none.
pub fn classification_key(material_name: &str, node_name: &str) -> String {
    if material_name.is_empty() {
        node_name.to_lowercase()
    } else {
        material_name.to_lowercase()
    }
}

pub fn classify(material_name: &str, node_name: &str) -> MaterialClass {
    let key = classification_key(material_name, node_name);
    if BODY_KEYWORDS.iter().any(|keyword| key.contains(keyword)) {
        MaterialClass::Body
    } else {
        MaterialClass::Other
    }
}

/// Paint every body mesh below `root` with `color`. Returns how many meshes were painted.
///
/// Meshes without a material are skipped, and nothing but the material colour changes.
pub fn recolor(graph: &mut SceneGraph, root: NodeId, color: Color) -> usize {
    let mut painted = 0;
    for id in graph.descendants(root) {
        let node = graph.node_mut(id);
        let node_name = node.name.clone();
        let Some(material) = node.as_mesh_mut().and_then(|mesh| mesh.material.as_mut()) else {
            continue;
        };
        if classify(&material.name, &node_name) == MaterialClass::Body {
            material.color = color;
            painted += 1;
        }
    }
    log::debug!("recoloured {painted} body meshes to {:06x}", color.to_hex());
    painted
}
