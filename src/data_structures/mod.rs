//! Viewer data structures: scene graph, transforms, bounds, GPU meshes and textures.
//!
//! - `scene_graph` is the arena of group and mesh nodes the whole viewer operates on
//! - `transform` holds node transforms and their per-instance GPU layout
//! - `bounds` contains axis-aligned boxes used for normalization
//! - `model` contains the vertex layout and GPU buffers of a mesh node
//! - `texture` contains GPU texture wrappers for colour, depth and shadow maps

pub mod bounds;
pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod transform;
