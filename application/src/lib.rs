//! Application layer for parley
//!
//! This crate wires the turn arbitration core into a per-turn use case: it
//! polls every registered component, runs response and prompt ranking,
//! assembles the outgoing reply, and drives the sparse-update merge protocol
//! against the conversation store. It depends only on the domain layer;
//! storage and logging adapters implement the ports defined here.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::conversation_store::{ConversationRecord, ConversationStore, StoreError};
pub use ports::turn_logger::{NoTurnLogger, RankEntry, TurnEvent, TurnLogger};
pub use use_cases::run_turn::{RunTurnError, TurnOutcome, TurnRequest, TurnRunner};
