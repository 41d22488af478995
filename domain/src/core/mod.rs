//! Core value objects and error types shared across the domain layer.

pub mod entity;
pub mod error;
pub mod name;

pub use entity::{Entity, EntityCategory};
pub use error::ArbitrationError;
pub use name::{ComponentName, NodeName};
