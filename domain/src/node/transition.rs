//! Per-component transition tables
//!
//! When a component's persisted `next_node` is the reserved `"transition"`
//! token, the previous node is looked up in its transition table: an ordered
//! list of (guard, outcome) arms, first match wins. A flag match is just a
//! set-membership predicate, so flag-driven and predicate-driven arms share
//! one dispatch mechanism. No matching rule or arm is a configuration error.

use crate::candidate::Candidate;
use crate::context::TurnView;
use crate::core::{ArbitrationError, ComponentName, NodeName};
use crate::flags::{TurnFlags, UserInitiative};
use crate::state::ComponentState;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named turn flag usable as a transition guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKey {
    Question,
    Disinterested,
    ChangeTopic,
    RepeatRequest,
    Complaint,
    Initiative(UserInitiative),
}

impl FlagKey {
    pub fn is_set(&self, flags: &TurnFlags) -> bool {
        match self {
            FlagKey::Question => flags.question,
            FlagKey::Disinterested => flags.disinterested,
            FlagKey::ChangeTopic => flags.change_topic,
            FlagKey::RepeatRequest => flags.repeat_request,
            FlagKey::Complaint => flags.complaint,
            FlagKey::Initiative(i) => flags.has_initiative(*i),
        }
    }
}

/// Predicate over the turn view.
pub type GuardFn = Arc<dyn Fn(&TurnView<'_>) -> bool + Send + Sync>;

/// Producer of an immediate candidate from a transition arm.
pub type ProducerFn = Arc<dyn Fn(&TurnView<'_>, &ComponentState) -> Option<Candidate> + Send + Sync>;

/// Guard of one transition arm.
#[derive(Clone)]
pub enum TransitionGuard {
    /// Set-membership test on a turn flag.
    Flag(FlagKey),
    /// Arbitrary predicate over the turn view.
    When(GuardFn),
    /// Always matches; conventionally the last arm.
    Always,
}

impl TransitionGuard {
    pub fn when(predicate: impl Fn(&TurnView<'_>) -> bool + Send + Sync + 'static) -> Self {
        TransitionGuard::When(Arc::new(predicate))
    }

    pub fn matches(&self, view: &TurnView<'_>) -> bool {
        match self {
            TransitionGuard::Flag(key) => key.is_set(view.flags),
            TransitionGuard::When(predicate) => predicate(view),
            TransitionGuard::Always => true,
        }
    }
}

impl std::fmt::Debug for TransitionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionGuard::Flag(key) => write!(f, "Flag({:?})", key),
            TransitionGuard::When(_) => write!(f, "When(<predicate>)"),
            TransitionGuard::Always => write!(f, "Always"),
        }
    }
}

/// Outcome of a matched arm: jump to a node, or answer immediately.
#[derive(Clone)]
pub enum TransitionOutcome {
    Goto(NodeName),
    Immediate(ProducerFn),
}

impl TransitionOutcome {
    pub fn goto(name: impl Into<NodeName>) -> Self {
        TransitionOutcome::Goto(name.into())
    }

    pub fn immediate(
        producer: impl Fn(&TurnView<'_>, &ComponentState) -> Option<Candidate> + Send + Sync + 'static,
    ) -> Self {
        TransitionOutcome::Immediate(Arc::new(producer))
    }
}

impl std::fmt::Debug for TransitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionOutcome::Goto(name) => write!(f, "Goto({})", name),
            TransitionOutcome::Immediate(_) => write!(f, "Immediate(<producer>)"),
        }
    }
}

/// Ordered (guard, outcome) arms keyed by the previous node.
#[derive(Debug, Default)]
pub struct TransitionTable {
    rules: BTreeMap<NodeName, Vec<(TransitionGuard, TransitionOutcome)>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arm for transitions out of `from`. Arms are tried in insertion
    /// order.
    pub fn arm(
        mut self,
        from: impl Into<NodeName>,
        guard: TransitionGuard,
        outcome: TransitionOutcome,
    ) -> Self {
        self.rules.entry(from.into()).or_default().push((guard, outcome));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Select the first matching outcome for a transition out of `from`.
    pub fn select(
        &self,
        component: &ComponentName,
        from: &NodeName,
        view: &TurnView<'_>,
    ) -> Result<&TransitionOutcome, ArbitrationError> {
        let arms = self
            .rules
            .get(from)
            .ok_or_else(|| ArbitrationError::NoTransitionMatch {
                component: component.clone(),
                from: from.clone(),
            })?;
        arms.iter()
            .find(|(guard, _)| guard.matches(view))
            .map(|(_, outcome)| outcome)
            .ok_or_else(|| ArbitrationError::NoTransitionMatch {
                component: component.clone(),
                from: from.clone(),
            })
    }
}
