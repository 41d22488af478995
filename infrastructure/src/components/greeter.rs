//! Greeter reference component.
//!
//! The usual launch component: opens the conversation, asks for and stores
//! the guest's name, then hands control back through the exit pointer. Small
//! on purpose, but it exercises the whole flow machinery (node graph,
//! transition table, internal prompt chaining, exit hand-off), which makes it
//! the template to copy when writing a real topic component.

use parley_domain::candidate::Candidate;
use parley_domain::component::{ComponentConfig, DialogueComponent, TriggerSet};
use parley_domain::context::TurnView;
use parley_domain::core::{ComponentName, NodeName};
use parley_domain::node::{
    ConversationNode, FlagKey, NodePointer, NodeRegistry, TransitionGuard, TransitionOutcome,
    TransitionTable,
};
use parley_domain::priority::{Priority, PromptType, TieBreak};
use parley_domain::state::{ComponentState, StateUpdate};
use std::sync::Arc;

const GUEST_NAME_FIELD: &str = "guest_name";

/// Opening node: greets and queues the ask-name exchange.
struct WelcomeNode {
    name: NodeName,
}

impl ConversationNode for WelcomeNode {
    fn name(&self) -> &NodeName {
        &self.name
    }

    fn respond(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        Some(
            Candidate::response("Hi, I'm Parley! Lovely to meet you.", Priority::CanStart)
                .with_update(
                    StateUpdate::none()
                        .with_current_node("welcome")
                        .with_next_node("ask_name"),
                ),
        )
    }
}

/// Consumes the guest's answer to the name question, stores it, and moves the
/// flow to its transition arms.
struct AskNameNode {
    name: NodeName,
}

impl AskNameNode {
    /// Crude name extraction: the last word of the utterance, stripped of
    /// punctuation.
    fn extract_name(utterance: &str) -> Option<String> {
        utterance
            .split_whitespace()
            .last()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
    }
}

impl ConversationNode for AskNameNode {
    fn name(&self) -> &NodeName {
        &self.name
    }

    fn respond(&self, view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        let name = Self::extract_name(view.utterance())?;
        Some(
            Candidate::response(
                format!("Nice to meet you, {}!", name),
                Priority::StrongContinue,
            )
            .with_update(
                StateUpdate::none()
                    .with_field(GUEST_NAME_FIELD, name)
                    .with_current_node("ask_name")
                    .with_next_node(NodePointer::Transition),
            ),
        )
    }

    fn prompt(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        Some(Candidate::prompt(
            "What should I call you?",
            PromptType::CurrentTopic,
        ))
    }
}

/// Closing node: says goodbye to the flow and queues the exit hand-off.
struct FarewellNode {
    name: NodeName,
}

impl ConversationNode for FarewellNode {
    fn name(&self) -> &NodeName {
        &self.name
    }

    fn respond(&self, _view: &TurnView<'_>, state: &ComponentState) -> Option<Candidate> {
        let line = match state.field(GUEST_NAME_FIELD).and_then(|v| v.as_str()) {
            Some(name) => format!("Well, {}, I'm all set on introductions.", name),
            None => "Well, I'm all set on introductions.".to_string(),
        };
        Some(
            Candidate::response(line, Priority::WeakContinue).with_update(
                StateUpdate::none()
                    .with_current_node("farewell")
                    .with_next_node(NodePointer::Exit),
            ),
        )
    }
}

/// The launch component: introductions, then a clean hand-off.
pub struct GreeterComponent {
    name: ComponentName,
    config: ComponentConfig,
    nodes: NodeRegistry,
    transitions: TransitionTable,
}

impl GreeterComponent {
    pub fn new() -> Self {
        let nodes = NodeRegistry::new()
            .with(Arc::new(WelcomeNode {
                name: NodeName::from("welcome"),
            }))
            .with(Arc::new(AskNameNode {
                name: NodeName::from("ask_name"),
            }))
            .with(Arc::new(FarewellNode {
                name: NodeName::from("farewell"),
            }));

        // After the name exchange: answer a direct question about the bot,
        // otherwise wind the flow down.
        let transitions = TransitionTable::new()
            .arm(
                "ask_name",
                TransitionGuard::Flag(FlagKey::Question),
                TransitionOutcome::immediate(|_view, _state| {
                    Some(
                        Candidate::response(
                            "Me? I'm Parley, your host for this chat.",
                            Priority::StrongContinue,
                        )
                        .with_update(
                            StateUpdate::none().with_next_node(NodePointer::Transition),
                        ),
                    )
                }),
            )
            .arm(
                "ask_name",
                TransitionGuard::Always,
                TransitionOutcome::goto("farewell"),
            );

        Self {
            name: ComponentName::from("greeter"),
            config: ComponentConfig::new(TieBreak::new(1))
                .with_triggers(TriggerSet::new().with_words(["hello", "hi", "hey"])),
            nodes,
            transitions,
        }
    }

    /// Replace the built-in settings with ones compiled from configuration.
    pub fn with_config(mut self, config: ComponentConfig) -> Self {
        self.config = config;
        self
    }

    fn open(&self, view: &TurnView<'_>, state: &ComponentState) -> Option<Candidate> {
        self.nodes
            .get(&NodeName::from("welcome"))
            .and_then(|node| node.respond(view, state))
    }
}

impl Default for GreeterComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogueComponent for GreeterComponent {
    fn name(&self) -> &ComponentName {
        &self.name
    }

    fn config(&self) -> &ComponentConfig {
        &self.config
    }

    fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    fn transitions(&self) -> Option<&TransitionTable> {
        Some(&self.transitions)
    }

    fn on_trigger(&self, view: &TurnView<'_>, state: &ComponentState) -> Option<Candidate> {
        self.open(view, state)
    }

    fn introductory_check(
        &self,
        view: &TurnView<'_>,
        state: &ComponentState,
    ) -> Option<Candidate> {
        if view.is_first_turn() {
            self.open(view, state)
        } else {
            None
        }
    }

    fn offer_prompt(&self, _view: &TurnView<'_>, state: &ComponentState) -> Candidate {
        // Only worth asking while we never learned the guest's name.
        if state.field(GUEST_NAME_FIELD).is_some() || state.in_flow() {
            return Candidate::no_prompt();
        }
        Candidate::prompt(
            "By the way, what should I call you?",
            PromptType::Contextual,
        )
        .with_update(
            StateUpdate::none()
                .with_current_node("welcome")
                .with_next_node("ask_name"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_domain::component::run_component_turn;
    use parley_domain::context::{ControlStatus, TurnContext};
    use parley_domain::flags::TurnFlags;

    fn yielding<'a>(
        flags: &'a TurnFlags,
        context: &'a TurnContext,
        turn_index: u64,
    ) -> TurnView<'a> {
        TurnView {
            turn_index,
            flags,
            context,
            controller: None,
            status: ControlStatus::Yielding,
        }
    }

    fn continuing<'a>(
        flags: &'a TurnFlags,
        context: &'a TurnContext,
        controller: &'a ComponentName,
        turn_index: u64,
    ) -> TurnView<'a> {
        TurnView {
            turn_index,
            flags,
            context,
            controller: Some(controller),
            status: ControlStatus::Continuing,
        }
    }

    #[test]
    fn test_opens_the_first_turn_and_chains_the_name_question() {
        let greeter = GreeterComponent::new();
        let flags = TurnFlags::new();
        let context = TurnContext::new("good evening");
        let view = yielding(&flags, &context, 0);

        let candidate = run_component_turn(&greeter, &ComponentState::new(), &view);
        assert!(candidate.text.contains("Lovely to meet you"));
        assert!(candidate.text.contains("What should I call you?"));
        assert_eq!(candidate.priority(), Some(Priority::CanStart));
    }

    #[test]
    fn test_trigger_word_opens_later_turns() {
        let greeter = GreeterComponent::new();
        let flags = TurnFlags::new();
        let context = TurnContext::new("hello there");
        let view = yielding(&flags, &context, 5);

        let candidate = run_component_turn(&greeter, &ComponentState::new(), &view);
        assert!(candidate.is_usable());
        assert!(candidate.text.contains("I'm Parley"));
    }

    #[test]
    fn test_stores_the_name_and_moves_to_transition() {
        let greeter = GreeterComponent::new();
        let flags = TurnFlags::new();
        let context = TurnContext::new("my name is Ada");
        let name = ComponentName::from("greeter");
        let view = continuing(&flags, &context, &name, 1);

        let mut state = ComponentState::new();
        state.next_node = NodePointer::from("ask_name");
        state.current_node = NodePointer::from("welcome");

        let candidate = run_component_turn(&greeter, &state, &view);
        assert!(candidate.text.contains("Nice to meet you, Ada!"));
        assert_eq!(
            candidate.update.fields.get(GUEST_NAME_FIELD),
            Some(&serde_json::Value::String("Ada".to_string()))
        );
    }

    #[test]
    fn test_transition_answers_a_question_or_winds_down() {
        let greeter = GreeterComponent::new();
        let name = ComponentName::from("greeter");
        let mut state = ComponentState::new();
        state.current_node = NodePointer::from("ask_name");
        state.next_node = NodePointer::Transition;
        state
            .fields
            .insert(GUEST_NAME_FIELD.to_string(), "Ada".into());

        let questioning = TurnFlags::new().with_question();
        let context = TurnContext::new("and who are you?");
        let view = continuing(&questioning, &context, &name, 2);
        let candidate = run_component_turn(&greeter, &state, &view);
        assert!(candidate.text.contains("your host"));

        let flags = TurnFlags::new();
        let context = TurnContext::new("okay");
        let view = continuing(&flags, &context, &name, 2);
        let candidate = run_component_turn(&greeter, &state, &view);
        assert!(candidate.text.contains("Ada"));
        assert!(candidate.text.contains("introductions"));
    }

    #[test]
    fn test_prompt_offer_depends_on_knowing_the_name() {
        let greeter = GreeterComponent::new();
        let flags = TurnFlags::new();
        let context = TurnContext::new("hm");
        let view = yielding(&flags, &context, 4);

        let fresh = ComponentState::new();
        let offer = greeter.offer_prompt(&view, &fresh);
        assert_eq!(offer.prompt_type(), Some(PromptType::Contextual));

        let mut known = ComponentState::new();
        known
            .fields
            .insert(GUEST_NAME_FIELD.to_string(), "Ada".into());
        assert!(!greeter.offer_prompt(&view, &known).is_usable());
    }
}
