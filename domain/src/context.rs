//! Shared turn context
//!
//! Read-only material every component sees during one turn: the utterance,
//! recent history, the tracked topic entity, and handles to expensive
//! annotations resolved lazily. Coordination between components happens only
//! through the controlling-identity record and the flags, both written once
//! per turn by the orchestrator.

use crate::core::{ComponentName, Entity};
use crate::flags::TurnFlags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Well-known annotation key: an async-generated hand-off acknowledgement
/// line consumed by the exit node.
pub const HANDOFF_ANNOTATION: &str = "handoff_ack";

/// Payload of one resolved annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Annotation {
    /// Generated text, when the annotation produces an utterance.
    #[serde(default)]
    pub text: Option<String>,
    /// Structured payload for non-textual annotations.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Annotation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            data: serde_json::Value::Null,
        }
    }
}

/// A future-like handle to an expensive annotation dispatched once per turn.
///
/// `resolve` blocks on first access, then the handle behaves as a memoized
/// value: every later call returns the same result synchronously. A failed or
/// timed-out resolution degrades to `None` ("annotation unavailable") and
/// never aborts the turn.
pub trait AnnotationHandle: Send + Sync {
    fn resolve(&self) -> Option<Annotation>;
}

/// An annotation that is already available. Useful for tests and for
/// annotations computed synchronously.
pub struct ReadyAnnotation(pub Annotation);

impl AnnotationHandle for ReadyAnnotation {
    fn resolve(&self) -> Option<Annotation> {
        Some(self.0.clone())
    }
}

/// Registry of the turn's annotation handles, keyed by annotation name.
#[derive(Default, Clone)]
pub struct AnnotationRegistry {
    handles: BTreeMap<String, Arc<dyn AnnotationHandle>>,
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, handle: Arc<dyn AnnotationHandle>) {
        self.handles.insert(key.into(), handle);
    }

    pub fn with(mut self, key: impl Into<String>, handle: Arc<dyn AnnotationHandle>) -> Self {
        self.insert(key, handle);
        self
    }

    /// Resolve an annotation by name. Missing handles and failed resolutions
    /// both come back as `None`.
    pub fn get(&self, key: &str) -> Option<Annotation> {
        self.handles.get(key).and_then(|h| h.resolve())
    }
}

impl std::fmt::Debug for AnnotationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationRegistry")
            .field("keys", &self.handles.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One past user/bot exchange, newest last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub reply: String,
}

/// Immutable shared context for one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    /// The user utterance being answered.
    pub utterance: String,
    /// Recent exchanges, newest last. History storage itself lives outside
    /// this core; only the window needed for repeats and continuity is here.
    pub history: Vec<Exchange>,
    /// Current-topic entity tracked across turns.
    pub tracked_entity: Option<Entity>,
    /// Lazily resolved annotations.
    pub annotations: AnnotationRegistry,
}

impl TurnContext {
    pub fn new(utterance: impl Into<String>) -> Self {
        Self {
            utterance: utterance.into(),
            ..Self::default()
        }
    }

    pub fn with_history(mut self, history: Vec<Exchange>) -> Self {
        self.history = history;
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.tracked_entity = Some(entity);
        self
    }

    pub fn with_annotations(mut self, annotations: AnnotationRegistry) -> Self {
        self.annotations = annotations;
        self
    }

    /// The bot's previous reply, if any.
    pub fn last_reply(&self) -> Option<&str> {
        self.history.last().map(|e| e.reply.as_str())
    }
}

/// Whether a component held control at the end of the previous turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlStatus {
    /// This component's response (or else its prompt) won last turn.
    Continuing,
    /// Some other component, or nobody, is in control.
    Yielding,
}

impl ControlStatus {
    pub fn of(me: &ComponentName, controller: Option<&ComponentName>) -> Self {
        if controller == Some(me) {
            ControlStatus::Continuing
        } else {
            ControlStatus::Yielding
        }
    }

    pub fn is_continuing(&self) -> bool {
        matches!(self, ControlStatus::Continuing)
    }
}

/// Per-component read view of the turn.
#[derive(Debug, Clone)]
pub struct TurnView<'a> {
    /// Zero-based turn index within the conversation.
    pub turn_index: u64,
    /// The turn's classification flags.
    pub flags: &'a TurnFlags,
    /// Shared read-only context.
    pub context: &'a TurnContext,
    /// The component in control after the previous turn.
    pub controller: Option<&'a ComponentName>,
    /// This component's own control status.
    pub status: ControlStatus,
}

impl<'a> TurnView<'a> {
    pub fn utterance(&self) -> &str {
        &self.context.utterance
    }

    pub fn is_first_turn(&self) -> bool {
        self.turn_index == 0
    }
}
