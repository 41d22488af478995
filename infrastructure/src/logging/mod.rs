//! Logging infrastructure — structured turn logging.
//!
//! Provides [`JsonlTurnLogger`], a JSONL file writer that implements the
//! [`TurnLogger`](parley_application::TurnLogger) port, and the tracing
//! subscriber setup for embedding hosts.

mod jsonl;
mod telemetry;

pub use jsonl::JsonlTurnLogger;
pub use telemetry::init_tracing;
