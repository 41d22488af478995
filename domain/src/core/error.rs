//! Domain error types

use super::name::{ComponentName, NodeName};
use thiserror::Error;

/// Errors raised by the turn arbitration core.
///
/// Configuration errors (`MissingFallback`, `UnknownNode`, `NoTransitionMatch`,
/// `MissingPromptWeight`) are surfaced to the caller or logged loudly and then
/// degraded; a live conversation must still produce some response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationError {
    #[error("candidate set is empty")]
    EmptyCandidateSet,

    #[error("no universal-fallback candidate offered (components: {offered})")]
    MissingFallback { offered: String },

    #[error("invalid candidate from '{component}': {reason}")]
    InvalidCandidate {
        component: ComponentName,
        reason: String,
    },

    #[error("component '{component}' has no node named '{node}'")]
    UnknownNode {
        component: ComponentName,
        node: NodeName,
    },

    #[error("no transition rule matches from node '{from}' in component '{component}'")]
    NoTransitionMatch {
        component: ComponentName,
        from: NodeName,
    },

    #[error("no preference weight for prompt type '{prompt_type}' and component '{component}'")]
    MissingPromptWeight {
        prompt_type: String,
        component: ComponentName,
    },

    #[error("unknown component: {0}")]
    UnknownComponent(ComponentName),
}

impl ArbitrationError {
    /// Check whether this error is a configuration error that arbitration
    /// degrades around rather than aborting the turn.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ArbitrationError::MissingFallback { .. }
                | ArbitrationError::UnknownNode { .. }
                | ArbitrationError::NoTransitionMatch { .. }
                | ArbitrationError::MissingPromptWeight { .. }
        )
    }
}
