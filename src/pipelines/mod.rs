//! Render pipelines: lit meshes, shadow depth passes and the egui overlay.

pub mod basic;
pub mod gui;
pub mod light;
pub mod shadow;
