//! Reference dialogue components
//!
//! Two small built-in participants: the always-available fallback and the
//! greeter launch flow. Real deployments register their own topic components
//! alongside (or instead of) these.

mod fallback;
mod greeter;

pub use fallback::FallbackComponent;
pub use greeter::GreeterComponent;
