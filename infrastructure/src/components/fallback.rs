//! Catch-all reference component.

use parley_domain::candidate::Candidate;
use parley_domain::component::{ComponentConfig, DialogueComponent, shared};
use parley_domain::context::TurnView;
use parley_domain::core::ComponentName;
use parley_domain::node::NodeRegistry;
use parley_domain::priority::{PromptType, TieBreak};
use parley_domain::state::ComponentState;

const GENERIC_PROMPTS: [&str; 3] = [
    "What would you like to talk about?",
    "Is there anything on your mind?",
    "So, what shall we chat about next?",
];

/// Always-available fallback participant.
///
/// Registering one component that never answers below the universal-fallback
/// level keeps response ranking's mandatory-fallback requirement satisfied
/// for every registry that includes it.
pub struct FallbackComponent {
    name: ComponentName,
    config: ComponentConfig,
    nodes: NodeRegistry,
}

impl FallbackComponent {
    pub fn new() -> Self {
        Self {
            name: ComponentName::from("fallback"),
            config: ComponentConfig::new(TieBreak::new(0)),
            nodes: NodeRegistry::new(),
        }
    }

    /// Replace the built-in settings with ones compiled from configuration.
    pub fn with_config(mut self, config: ComponentConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for FallbackComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogueComponent for FallbackComponent {
    fn name(&self) -> &ComponentName {
        &self.name
    }

    fn config(&self) -> &ComponentConfig {
        &self.config
    }

    fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    fn post_check(&self, view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        Some(shared::universal_fallback(view.turn_index))
    }

    fn offer_prompt(&self, view: &TurnView<'_>, _state: &ComponentState) -> Candidate {
        let line = GENERIC_PROMPTS[(view.turn_index as usize) % GENERIC_PROMPTS.len()];
        Candidate::prompt(line, PromptType::Generic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_domain::component::run_component_turn;
    use parley_domain::context::{ControlStatus, TurnContext};
    use parley_domain::flags::TurnFlags;
    use parley_domain::priority::Priority;

    #[test]
    fn test_always_offers_the_universal_fallback() {
        let component = FallbackComponent::new();
        let flags = TurnFlags::new();
        let context = TurnContext::new("complete gibberish");
        let view = TurnView {
            turn_index: 3,
            flags: &flags,
            context: &context,
            controller: None,
            status: ControlStatus::Yielding,
        };

        let candidate = run_component_turn(&component, &ComponentState::new(), &view);
        assert_eq!(candidate.priority(), Some(Priority::UniversalFallback));
        assert!(candidate.needs_prompt);
    }

    #[test]
    fn test_generic_prompt_rotates() {
        let component = FallbackComponent::new();
        let flags = TurnFlags::new();
        let context = TurnContext::new("hm");
        let state = ComponentState::new();
        let mut seen = std::collections::BTreeSet::new();
        for turn in 0..3 {
            let view = TurnView {
                turn_index: turn,
                flags: &flags,
                context: &context,
                controller: None,
                status: ControlStatus::Yielding,
            };
            let offer = component.offer_prompt(&view, &state);
            assert_eq!(offer.prompt_type(), Some(PromptType::Generic));
            seen.insert(offer.text);
        }
        assert_eq!(seen.len(), 3);
    }
}
