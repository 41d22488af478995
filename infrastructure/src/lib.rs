//! Infrastructure layer for parley
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: configuration file loading and the config-to-runner
//! bootstrap, the tokio-backed annotation resolver, the JSONL turn logger,
//! the in-memory conversation store, and two reference components.

pub mod annotation;
pub mod bootstrap;
pub mod components;
pub mod config;
pub mod logging;
pub mod store;

// Re-export commonly used types
pub use annotation::SpawnedAnnotation;
pub use bootstrap::{assemble, component_config};
pub use components::{FallbackComponent, GreeterComponent};
pub use config::{
    ConfigLoader, FileArbiterConfig, FileComponentConfig, FileConfig, FilePromptsConfig,
    FileResetPolicy,
};
pub use logging::{JsonlTurnLogger, init_tracing};
pub use store::InMemoryConversationStore;
