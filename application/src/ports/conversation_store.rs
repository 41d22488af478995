//! Port for durable per-conversation arbitration state.
//!
//! The store owns one [`ConversationRecord`] per conversation: the turn
//! counter, the controlling-identity record, every component's private state,
//! and the recency bookkeeping prompt arbitration consumes. Records are
//! created with defaults on first reference and written back exactly once per
//! turn, after the merge protocol has run.

use parley_domain::core::ComponentName;
use parley_domain::state::ComponentState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from conversation state storage.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Durable arbitration state of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversationRecord {
    /// Zero-based index of the next turn to run.
    #[serde(default)]
    pub turn_index: u64,
    /// The component in control after the previous turn, if any.
    #[serde(default)]
    pub controller: Option<ComponentName>,
    /// Every component's private state, keyed by component name. Exclusively
    /// owned by the named component; no cross-component access.
    #[serde(default)]
    pub states: BTreeMap<ComponentName, ComponentState>,
    /// Turn index at which each component last spoke (won the response or
    /// contributed the appended prompt).
    #[serde(default)]
    pub last_spoken: BTreeMap<ComponentName, u64>,
}

impl ConversationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A component's state, created with defaults on first reference.
    pub fn state_mut(&mut self, name: &ComponentName) -> &mut ComponentState {
        self.states.entry(name.clone()).or_default()
    }

    /// Turns since the component last spoke; components that never spoke get
    /// the largest value.
    pub fn turns_since_spoken(&self, name: &ComponentName) -> u64 {
        match self.last_spoken.get(name) {
            Some(turn) => self.turn_index.saturating_sub(*turn),
            None => self.turn_index + 1,
        }
    }

    /// The recency signal for prompt arbitration over the given components.
    pub fn recency<'a>(
        &self,
        names: impl Iterator<Item = &'a ComponentName>,
    ) -> BTreeMap<ComponentName, u64> {
        names
            .map(|n| (n.clone(), self.turns_since_spoken(n)))
            .collect()
    }

    /// Record that a component spoke this turn.
    pub fn mark_spoken(&mut self, name: &ComponentName, turn: u64) {
        self.last_spoken.insert(name.clone(), turn);
    }
}

/// Port for loading and saving conversation records.
pub trait ConversationStore: Send + Sync {
    /// Load a conversation's record, or a default record if none exists yet.
    fn load(&self, conversation_id: &str) -> Result<ConversationRecord, StoreError>;

    /// Persist a conversation's record.
    fn save(&self, conversation_id: &str, record: &ConversationRecord) -> Result<(), StoreError>;
}
