//! Application use cases

pub mod run_turn;

pub use run_turn::{RunTurnError, TurnOutcome, TurnRequest, TurnRunner};
