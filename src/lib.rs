//! showroom
//!
//! A wgpu viewer that presents a single glTF car model. The model is loaded in the
//! background while a grey placeholder box stands in for it, then scaled to a fixed size,
//! put on the ground, painted in the chosen body colour and slowly turned under a
//! shadowed sun and spotlight. An egui panel exposes the model transform, the body colour,
//! the spotlight, auto-rotation and the shadow settings.
//!
//! High-level modules
//! - `camera`: perspective camera, orbit controls and the camera uniform
//! - `config`: viewer settings and their environment overrides
//! - `context`: window, GPU device, surface and the shared render state
//! - `data_structures`: scene graph, bounds, transforms, GPU vertex and texture types
//! - `flow`: the winit application and its per-frame loop
//! - `gui`: egui host, control panel, loading overlay and localized labels
//! - `pipelines`: mesh, shadow and GUI render pipelines
//! - `render`: uploads the scene graph and records the shadow and main passes
//! - `resources`: asynchronous glTF loading and built-in geometry
//! - `scene`: normalizer, body paint classifier, lights and the showroom itself
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod gui;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

pub use config::ViewerConfig;
pub use flow::run;
