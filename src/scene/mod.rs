//! The showroom scene: model placement, paint, lights and the composition root.

pub mod classifier;
pub mod composer;
pub mod lights;
pub mod normalizer;
