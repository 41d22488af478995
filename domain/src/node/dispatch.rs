//! Node pointer dispatch
//!
//! Resumes a component's flow from its persisted `next_node` pointer.
//! Configuration errors (unknown node, missing transition match) are logged
//! loudly and degraded to "no answer" so the turn always completes.

use super::transition::{TransitionOutcome, TransitionTable};
use super::{ConversationNode, NodePointer, NodeRegistry};
use crate::candidate::Candidate;
use crate::component::shared;
use crate::context::TurnView;
use crate::core::{ArbitrationError, ComponentName, NodeName};
use crate::state::ComponentState;
use std::sync::Arc;
use tracing::error;

/// Resume a component's node graph from its persisted pointer.
///
/// Returns `None` both when the pointer is empty and when a configuration
/// error made the flow unresumable; the protocol then falls through to its
/// later steps.
pub fn dispatch_next_node(
    component: &ComponentName,
    nodes: &NodeRegistry,
    transitions: Option<&TransitionTable>,
    state: &ComponentState,
    view: &TurnView<'_>,
) -> Option<Candidate> {
    match &state.next_node {
        NodePointer::Empty => None,
        NodePointer::Node(name) => invoke(component, nodes, name, view, state),
        NodePointer::Transition => {
            let from = match &state.current_node {
                NodePointer::Node(name) => name.clone(),
                other => {
                    error!(
                        component = %component,
                        current = %other,
                        "transition dispatch requires a concrete previous node"
                    );
                    return None;
                }
            };
            let table = match transitions {
                Some(table) => table,
                None => {
                    error!(component = %component, "transition pointer set but component has no table");
                    return None;
                }
            };
            match table.select(component, &from, view) {
                Ok(TransitionOutcome::Goto(name)) => invoke(component, nodes, name, view, state),
                Ok(TransitionOutcome::Immediate(producer)) => producer(view, state),
                Err(err) => {
                    error!(component = %component, %err, "transition table had no match");
                    None
                }
            }
        }
        NodePointer::Any => nodes.iter().find_map(|node| node.respond(view, state)),
        NodePointer::Exit => Some(shared::exit_handoff(view)),
    }
}

/// Look up a node's internal prompt, for response+prompt chaining.
pub fn node_prompt(
    component: &ComponentName,
    nodes: &NodeRegistry,
    name: &NodeName,
    view: &TurnView<'_>,
    state: &ComponentState,
) -> Option<Candidate> {
    match lookup(component, nodes, name) {
        Some(node) => node.prompt(view, state),
        None => None,
    }
}

fn invoke(
    component: &ComponentName,
    nodes: &NodeRegistry,
    name: &NodeName,
    view: &TurnView<'_>,
    state: &ComponentState,
) -> Option<Candidate> {
    lookup(component, nodes, name).and_then(|node| node.respond(view, state))
}

fn lookup<'a>(
    component: &ComponentName,
    nodes: &'a NodeRegistry,
    name: &NodeName,
) -> Option<&'a Arc<dyn ConversationNode>> {
    let found = nodes.get(name);
    if found.is_none() {
        let err = ArbitrationError::UnknownNode {
            component: component.clone(),
            node: name.clone(),
        };
        error!(component = %component, %err, "node lookup failed");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ControlStatus, TurnContext};
    use crate::core::NodeName;
    use crate::flags::TurnFlags;
    use crate::node::transition::TransitionGuard;
    use crate::priority::Priority;
    use crate::state::StateUpdate;

    struct EchoNode {
        name: NodeName,
        line: Option<&'static str>,
    }

    impl EchoNode {
        fn arc(name: &str, line: Option<&'static str>) -> Arc<dyn ConversationNode> {
            Arc::new(EchoNode {
                name: NodeName::from(name),
                line,
            })
        }
    }

    impl ConversationNode for EchoNode {
        fn name(&self) -> &NodeName {
            &self.name
        }

        fn respond(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
            self.line.map(|l| {
                Candidate::response(l, Priority::StrongContinue)
                    .with_update(StateUpdate::none().with_next_node(NodePointer::Exit))
            })
        }
    }

    fn view<'a>(flags: &'a TurnFlags, context: &'a TurnContext) -> TurnView<'a> {
        TurnView {
            turn_index: 1,
            flags,
            context,
            controller: None,
            status: ControlStatus::Continuing,
        }
    }

    fn state_with(next: NodePointer, current: NodePointer) -> ComponentState {
        ComponentState {
            next_node: next,
            current_node: current,
            ..ComponentState::new()
        }
    }

    #[test]
    fn test_empty_pointer_yields_nothing() {
        let component = ComponentName::from("c");
        let nodes = NodeRegistry::new();
        let flags = TurnFlags::new();
        let context = TurnContext::new("hi");
        let result = dispatch_next_node(
            &component,
            &nodes,
            None,
            &state_with(NodePointer::Empty, NodePointer::Empty),
            &view(&flags, &context),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_direct_node_invocation() {
        let component = ComponentName::from("c");
        let nodes = NodeRegistry::new().with(EchoNode::arc("hello", Some("hi there")));
        let flags = TurnFlags::new();
        let context = TurnContext::new("hi");
        let result = dispatch_next_node(
            &component,
            &nodes,
            None,
            &state_with(NodePointer::from("hello"), NodePointer::Empty),
            &view(&flags, &context),
        );
        assert_eq!(result.unwrap().text, "hi there");
    }

    #[test]
    fn test_unknown_node_degrades_to_none() {
        let component = ComponentName::from("c");
        let nodes = NodeRegistry::new();
        let flags = TurnFlags::new();
        let context = TurnContext::new("hi");
        let result = dispatch_next_node(
            &component,
            &nodes,
            None,
            &state_with(NodePointer::from("ghost"), NodePointer::Empty),
            &view(&flags, &context),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_any_polls_in_registration_order() {
        let component = ComponentName::from("c");
        let nodes = NodeRegistry::new()
            .with(EchoNode::arc("silent", None))
            .with(EchoNode::arc("first", Some("first answer")))
            .with(EchoNode::arc("second", Some("second answer")));
        let flags = TurnFlags::new();
        let context = TurnContext::new("hi");
        let result = dispatch_next_node(
            &component,
            &nodes,
            None,
            &state_with(NodePointer::Any, NodePointer::Empty),
            &view(&flags, &context),
        );
        assert_eq!(result.unwrap().text, "first answer");
    }

    #[test]
    fn test_transition_goto() {
        let component = ComponentName::from("c");
        let nodes = NodeRegistry::new().with(EchoNode::arc("next", Some("moved on")));
        let table = TransitionTable::new().arm(
            "prev",
            TransitionGuard::Always,
            TransitionOutcome::goto("next"),
        );
        let flags = TurnFlags::new();
        let context = TurnContext::new("hi");
        let result = dispatch_next_node(
            &component,
            &nodes,
            Some(&table),
            &state_with(NodePointer::Transition, NodePointer::from("prev")),
            &view(&flags, &context),
        );
        assert_eq!(result.unwrap().text, "moved on");
    }

    #[test]
    fn test_transition_without_table_degrades() {
        let component = ComponentName::from("c");
        let nodes = NodeRegistry::new();
        let flags = TurnFlags::new();
        let context = TurnContext::new("hi");
        let result = dispatch_next_node(
            &component,
            &nodes,
            None,
            &state_with(NodePointer::Transition, NodePointer::from("prev")),
            &view(&flags, &context),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_exit_produces_handoff_wanting_prompt() {
        let component = ComponentName::from("c");
        let nodes = NodeRegistry::new();
        let flags = TurnFlags::new();
        let context = TurnContext::new("bye");
        let result = dispatch_next_node(
            &component,
            &nodes,
            None,
            &state_with(NodePointer::Exit, NodePointer::Empty),
            &view(&flags, &context),
        )
        .unwrap();
        assert!(result.needs_prompt);
        assert!(result.is_usable());
    }
}
