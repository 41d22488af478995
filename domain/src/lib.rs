//! Domain layer for parley
//!
//! This crate contains the turn arbitration core: the business logic that,
//! each conversational turn, collects candidate utterances from competing
//! dialogue components, selects exactly one response and one follow-up
//! prompt, and merges every component's private state.
//!
//! # Core Concepts
//!
//! ## Arbitration
//!
//! - **Response ranking**: strict priority with deterministic per-component
//!   tie-breaks ([`ranking::rank_responses`])
//! - **Prompt ranking**: weighted-random selection over tunable preference
//!   tables and a recency signal ([`ranking::rank_prompts`])
//!
//! ## Components
//!
//! Every component implements the same per-turn protocol
//! ([`component::run_component_turn`]): classify, decide
//! continue / start / yield, delegate to its node graph, and return exactly
//! one [`candidate::Candidate`]. State advances only through the sparse-update
//! merge protocol ([`state::ComponentState`]) after arbitration.

pub mod candidate;
pub mod component;
pub mod context;
pub mod core;
pub mod flags;
pub mod node;
pub mod priority;
pub mod ranking;
pub mod state;

// Re-export commonly used types
pub use candidate::{AnswerType, Candidate, Rank};
pub use component::{
    ChangeTopicOutcome, ComponentConfig, ComponentRegistry, DialogueComponent, TriggerSet,
    run_component_turn,
};
pub use context::{
    Annotation, AnnotationHandle, AnnotationRegistry, ControlStatus, Exchange, HANDOFF_ANNOTATION,
    ReadyAnnotation, TurnContext, TurnView,
};
pub use core::{ArbitrationError, ComponentName, Entity, EntityCategory, NodeName};
pub use flags::{TurnFlags, UserInitiative};
pub use node::{
    ConversationNode, FlagKey, NodePointer, NodeRegistry, TransitionGuard, TransitionOutcome,
    TransitionTable, dispatch_next_node,
};
pub use priority::{PromptType, Priority, TieBreak};
pub use ranking::{
    PromptPreferences, RankedSet, rank_prompts, rank_responses, rank_responses_unchecked,
};
pub use state::{ComponentState, FieldUpdate, ResetPolicy, StateUpdate};
