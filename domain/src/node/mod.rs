//! Conversation nodes and pointer dispatch
//!
//! A [`ConversationNode`] is a component-internal unit producing one kind of
//! response or prompt and advancing the component's internal pointer.
//! Components compose nodes into a transition graph; the persisted pointers
//! are [`NodePointer`] values, either empty, a declared node name, or one of
//! the reserved dispatch tokens.

pub mod dispatch;
pub mod transition;

pub use dispatch::dispatch_next_node;
pub use transition::{FlagKey, TransitionGuard, TransitionOutcome, TransitionTable};

use crate::candidate::Candidate;
use crate::context::TurnView;
use crate::core::{EntityCategory, NodeName};
use crate::state::ComponentState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Persisted node pointer.
///
/// Serializes as a plain string: `""` (empty), the reserved tokens
/// `"transition"`, `"any"`, `"exit"`, or a declared node name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum NodePointer {
    /// Not in a flow.
    #[default]
    Empty,
    /// Consult the component's transition table from the previous node.
    Transition,
    /// Poll every registered node; first non-empty answer wins.
    Any,
    /// Leave the flow with the shared hand-off acknowledgement.
    Exit,
    /// Invoke the named node directly.
    Node(NodeName),
}

impl NodePointer {
    pub fn as_str(&self) -> &str {
        match self {
            NodePointer::Empty => "",
            NodePointer::Transition => "transition",
            NodePointer::Any => "any",
            NodePointer::Exit => "exit",
            NodePointer::Node(name) => name.as_str(),
        }
    }
}

impl From<String> for NodePointer {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" => NodePointer::Empty,
            "transition" => NodePointer::Transition,
            "any" => NodePointer::Any,
            "exit" => NodePointer::Exit,
            _ => NodePointer::Node(NodeName::from(s)),
        }
    }
}

impl From<&str> for NodePointer {
    fn from(s: &str) -> Self {
        NodePointer::from(s.to_string())
    }
}

impl From<NodePointer> for String {
    fn from(pointer: NodePointer) -> Self {
        pointer.as_str().to_string()
    }
}

impl From<NodeName> for NodePointer {
    fn from(name: NodeName) -> Self {
        NodePointer::Node(name)
    }
}

impl std::fmt::Display for NodePointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodePointer::Empty => write!(f, "<empty>"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// One unit of a component's conversation flow.
///
/// `respond` produces the node's utterance (and, through the candidate's
/// update, advances the pointer); `prompt` produces the node's internal
/// follow-up question. Both take the turn view and the component state
/// explicitly: a node that ignores the state simply does not read it.
pub trait ConversationNode: Send + Sync {
    fn name(&self) -> &NodeName;

    /// Entity categories that can pull the conversation into this node.
    fn trigger_categories(&self) -> &[EntityCategory] {
        &[]
    }

    /// Produce this node's response, or `None` when the node has nothing to
    /// say for this turn.
    fn respond(&self, view: &TurnView<'_>, state: &ComponentState) -> Option<Candidate>;

    /// Produce this node's internal prompt, used by response+prompt chaining.
    fn prompt(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        None
    }
}

/// Explicit name → node registration table, built at startup.
///
/// Registration order is preserved; `any` dispatch polls nodes in that order
/// so results are deterministic.
#[derive(Default)]
pub struct NodeRegistry {
    order: Vec<Arc<dyn ConversationNode>>,
    index: BTreeMap<NodeName, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, node: Arc<dyn ConversationNode>) {
        let name = node.name().clone();
        if let Some(&slot) = self.index.get(&name) {
            warn!(node = %name, "replacing already-registered conversation node");
            self.order[slot] = node;
            return;
        }
        self.index.insert(name, self.order.len());
        self.order.push(node);
    }

    pub fn with(mut self, node: Arc<dyn ConversationNode>) -> Self {
        self.register(node);
        self
    }

    pub fn get(&self, name: &NodeName) -> Option<&Arc<dyn ConversationNode>> {
        self.index.get(name).map(|&slot| &self.order[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ConversationNode>> {
        self.order.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// First registered node claiming the given category.
    pub fn node_for_category(&self, category: &EntityCategory) -> Option<&Arc<dyn ConversationNode>> {
        self.order
            .iter()
            .find(|n| n.trigger_categories().contains(category))
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.order.iter().map(|n| n.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::Priority;

    struct FixedNode {
        name: NodeName,
        categories: Vec<EntityCategory>,
        line: Option<&'static str>,
    }

    impl ConversationNode for FixedNode {
        fn name(&self) -> &NodeName {
            &self.name
        }

        fn trigger_categories(&self) -> &[EntityCategory] {
            &self.categories
        }

        fn respond(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
            self.line
                .map(|l| Candidate::response(l, Priority::StrongContinue))
        }
    }

    #[test]
    fn test_pointer_reserved_tokens_round_trip() {
        for pointer in [
            NodePointer::Empty,
            NodePointer::Transition,
            NodePointer::Any,
            NodePointer::Exit,
            NodePointer::Node(NodeName::from("ask_name")),
        ] {
            let json = serde_json::to_string(&pointer).unwrap();
            let back: NodePointer = serde_json::from_str(&json).unwrap();
            assert_eq!(back, pointer);
        }
        assert_eq!(NodePointer::from("transition"), NodePointer::Transition);
        assert_eq!(NodePointer::from(""), NodePointer::Empty);
        assert_eq!(
            NodePointer::from("welcome"),
            NodePointer::Node(NodeName::from("welcome"))
        );
    }

    #[test]
    fn test_registry_preserves_order_and_finds_categories() {
        let registry = NodeRegistry::new()
            .with(Arc::new(FixedNode {
                name: NodeName::from("a"),
                categories: vec![],
                line: None,
            }))
            .with(Arc::new(FixedNode {
                name: NodeName::from("b"),
                categories: vec![EntityCategory::from("musician")],
                line: Some("b speaks"),
            }));

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&NodeName::from("a")).is_some());
        let hit = registry.node_for_category(&EntityCategory::from("musician"));
        assert_eq!(hit.map(|n| n.name().as_str()), Some("b"));
    }
}
