//! Async annotation resolution

mod spawned;

pub use spawned::SpawnedAnnotation;
