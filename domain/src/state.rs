//! Persisted component state and the sparse-update merge protocol
//!
//! Each component owns one durable state record per conversation: its node
//! pointers, a consecutive-turns-in-control counter, and component-specific
//! named fields. State is created with defaults on first reference and is
//! mutated only through the merge protocol after arbitration: the turn's
//! winners advance via [`ComponentState::apply_if_chosen`], everyone else is
//! reset via [`ComponentState::apply_if_not_chosen`].
//!
//! Updates are sparse: each pointer field is either [`FieldUpdate::Set`] or
//! the explicit no-change marker [`FieldUpdate::Keep`]; named fields change
//! only when their key is present in the update map, so the marker is never a
//! legal field value.

use crate::node::NodePointer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sparse update for a single field: either keep the current value or
/// replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldUpdate<T> {
    /// Explicit no-change marker.
    #[default]
    Keep,
    /// Replace the field with this value.
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, FieldUpdate::Keep)
    }

    /// Apply this update onto a field in place.
    pub fn apply_to(self, field: &mut T) {
        if let FieldUpdate::Set(value) = self {
            *field = value;
        }
    }
}

/// Sparse update a candidate carries back from its component.
///
/// Only non-`Keep` pointer fields and present map keys are merged; merging is
/// idempotent under repeated application. `reset_fields` clears the named
/// fields before the update's own keys land, so a candidate produced on the
/// way out of control can erase state it would otherwise keep resurrecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StateUpdate {
    /// Node the component considers active after this turn.
    #[serde(default)]
    pub current_node: FieldUpdate<NodePointer>,
    /// Node the component expects to resume at next turn.
    #[serde(default)]
    pub next_node: FieldUpdate<NodePointer>,
    /// Clear every named field before applying `fields`.
    #[serde(default)]
    pub reset_fields: bool,
    /// Component-specific named fields; a present key is a replacement value.
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl StateUpdate {
    /// The all-`Keep` update.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_current_node(mut self, pointer: impl Into<NodePointer>) -> Self {
        self.current_node = FieldUpdate::Set(pointer.into());
        self
    }

    pub fn with_next_node(mut self, pointer: impl Into<NodePointer>) -> Self {
        self.next_node = FieldUpdate::Set(pointer.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn clearing_fields(mut self) -> Self {
        self.reset_fields = true;
        self
    }

    /// Overlay `other` onto this update; `other`'s non-`Keep` fields win.
    ///
    /// Used by internal prompt chaining to fold a node prompt's update into
    /// the response candidate's update.
    pub fn merged_with(mut self, other: StateUpdate) -> Self {
        if !other.current_node.is_keep() {
            self.current_node = other.current_node;
        }
        if !other.next_node.is_keep() {
            self.next_node = other.next_node;
        }
        self.reset_fields = self.reset_fields || other.reset_fields;
        self.fields.extend(other.fields);
        self
    }

    /// Check that the update is pure no-change.
    pub fn is_none(&self) -> bool {
        self.current_node.is_keep()
            && self.next_node.is_keep()
            && !self.reset_fields
            && self.fields.is_empty()
    }
}

/// Policy applied to a component's state when it was not chosen this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Reset node pointers and the control counter, keep named fields.
    #[default]
    PointersOnly,
    /// Also clear every named field. Used by negotiation-style components
    /// that cannot resume a half-finished exchange after losing control.
    Full,
}

/// Durable per-component, per-conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ComponentState {
    /// Node that produced the component's last output, if any.
    #[serde(default)]
    pub current_node: NodePointer,
    /// Node the component expects to resume at; [`NodePointer::Empty`] means
    /// "not in control".
    #[serde(default)]
    pub next_node: NodePointer,
    /// Consecutive turns this component has held control.
    #[serde(default)]
    pub turns_in_control: u32,
    /// Turn index at which the counter was last advanced. Guards the
    /// increment so merging the same turn's update twice is idempotent.
    #[serde(default)]
    pub last_chosen_turn: Option<u64>,
    /// Component-specific named fields.
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl ComponentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the component is mid-flow (has a queued node).
    pub fn in_flow(&self) -> bool {
        self.next_node != NodePointer::Empty
    }

    /// Read a named field.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// Merge a sparse update into this state, replacing only non-marker
    /// fields. Idempotent.
    pub fn merge(&mut self, update: &StateUpdate) {
        update.current_node.clone().apply_to(&mut self.current_node);
        update.next_node.clone().apply_to(&mut self.next_node);
        if update.reset_fields {
            self.fields.clear();
        }
        for (key, value) in &update.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Merge the update and advance the consecutive-turns counter.
    ///
    /// Called exactly once per chosen component after arbitration. The
    /// counter increment is guarded by `turn`, so re-applying the same turn's
    /// update leaves the state unchanged.
    pub fn apply_if_chosen(&mut self, update: &StateUpdate, turn: u64) {
        self.merge(update);
        if self.last_chosen_turn != Some(turn) {
            self.turns_in_control = self.turns_in_control.saturating_add(1);
            self.last_chosen_turn = Some(turn);
        }
    }

    /// Reset control bookkeeping for a component that was not chosen.
    ///
    /// Node pointers become [`NodePointer::Empty`] and the counter is zeroed
    /// regardless of prior values; named fields survive unless the
    /// component's [`ResetPolicy`] asks for a full reset.
    pub fn apply_if_not_chosen(&mut self, policy: ResetPolicy) {
        self.current_node = NodePointer::Empty;
        self.next_node = NodePointer::Empty;
        self.turns_in_control = 0;
        if policy == ResetPolicy::Full {
            self.fields.clear();
        }
    }
}
