//! Configuration loading and raw file-format types

mod file_config;
mod loader;

pub use file_config::{
    FileArbiterConfig, FileComponentConfig, FileConfig, FilePromptsConfig, FileResetPolicy,
};
pub use loader::ConfigLoader;
