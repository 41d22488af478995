//! Dialogue components and the uniform turn protocol
//!
//! A component is one dialogue participant competing to speak each turn. All
//! components implement the same contract: classify the turn, decide whether
//! to continue, start, or yield, delegate internally to their node graph, and
//! return exactly one candidate. The ordered protocol itself lives in
//! [`protocol::run_component_turn`]; components customise behaviour through
//! the hook methods of [`DialogueComponent`], each defaulting to "no answer".

pub mod protocol;
pub mod registry;
pub mod shared;

pub use protocol::run_component_turn;
pub use registry::ComponentRegistry;

use crate::candidate::Candidate;
use crate::context::TurnView;
use crate::core::ComponentName;
use crate::flags::UserInitiative;
use crate::node::{NodeRegistry, TransitionTable};
use crate::priority::TieBreak;
use crate::state::{ComponentState, ResetPolicy};
use std::sync::Arc;

/// Compiled trigger predicate, injected by configuration (e.g. a compiled
/// regex template). Receives the lowercased utterance.
pub type TriggerPattern = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Trigger words, phrases, and compiled templates that can pull a yielding
/// component into the conversation.
#[derive(Clone, Default)]
pub struct TriggerSet {
    words: Vec<String>,
    phrases: Vec<String>,
    patterns: Vec<TriggerPattern>,
}

impl TriggerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_word(mut self, word: impl Into<String>) -> Self {
        self.words.push(word.into().to_lowercase());
        self
    }

    pub fn with_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words
            .extend(words.into_iter().map(|w| w.into().to_lowercase()));
        self
    }

    pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.phrases.push(phrase.into().to_lowercase());
        self
    }

    pub fn with_pattern(mut self, pattern: TriggerPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.phrases.is_empty() && self.patterns.is_empty()
    }

    /// Test the utterance against words (token match), phrases (substring),
    /// and compiled templates.
    pub fn matches(&self, utterance: &str) -> bool {
        let lowered = utterance.to_lowercase();
        if !self.words.is_empty() {
            let tokens: Vec<&str> = lowered
                .split_whitespace()
                .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
                .collect();
            if self.words.iter().any(|w| tokens.contains(&w.as_str())) {
                return true;
            }
        }
        if self.phrases.iter().any(|p| lowered.contains(p.as_str())) {
            return true;
        }
        self.patterns.iter().any(|p| p(&lowered))
    }
}

impl std::fmt::Debug for TriggerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerSet")
            .field("words", &self.words)
            .field("phrases", &self.phrases)
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

/// Fixed per-component configuration consumed by the turn protocol.
#[derive(Debug, Clone, Default)]
pub struct ComponentConfig {
    /// Fixed rank within a priority group.
    pub tie_break: TieBreak,
    /// Triggers that can pull this component in while yielding.
    pub triggers: TriggerSet,
    /// Components this one refuses to follow directly.
    pub never_follow: Vec<ComponentName>,
    /// What happens to this component's state when it is not chosen.
    pub reset_policy: ResetPolicy,
}

impl ComponentConfig {
    pub fn new(tie_break: TieBreak) -> Self {
        Self {
            tie_break,
            ..Self::default()
        }
    }

    pub fn with_triggers(mut self, triggers: TriggerSet) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn never_following(mut self, name: impl Into<ComponentName>) -> Self {
        self.never_follow.push(name.into());
        self
    }

    pub fn with_reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.reset_policy = policy;
        self
    }
}

/// A controlling component's reaction to the change-topic flag.
pub enum ChangeTopicOutcome {
    /// Fall through to the normal continuing steps.
    Decline,
    /// Answer the topic change directly.
    Respond(Candidate),
    /// Give up control; the protocol re-enters the yielding branch with a
    /// lost-control state.
    Relinquish,
}

/// One dialogue participant.
///
/// Hooks are called by [`protocol::run_component_turn`] in the protocol's
/// fixed order; every hook may return `None` ("no answer") to advance to the
/// next step. The defaults for the flag-driven continuing steps delegate to
/// the [`shared`] canned responses.
pub trait DialogueComponent: Send + Sync {
    fn name(&self) -> &ComponentName;

    fn config(&self) -> &ComponentConfig;

    fn nodes(&self) -> &NodeRegistry;

    fn transitions(&self) -> Option<&TransitionTable> {
        None
    }

    /// Rare control-independent checks that run before anything else.
    fn pre_check(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        None
    }

    /// Reaction to the change-topic flag while in control.
    fn on_change_topic(
        &self,
        _view: &TurnView<'_>,
        _state: &ComponentState,
    ) -> ChangeTopicOutcome {
        ChangeTopicOutcome::Decline
    }

    /// Component-specific complaint detection while in control.
    fn detect_complaint(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        None
    }

    /// Reaction to one entry of the abrupt user-initiative table.
    fn on_initiative(
        &self,
        _kind: UserInitiative,
        _view: &TurnView<'_>,
        _state: &ComponentState,
    ) -> Option<Candidate> {
        None
    }

    /// Reaction to the repeat-request flag; the default replays the previous
    /// reply from history.
    fn on_repeat_request(
        &self,
        view: &TurnView<'_>,
        _state: &ComponentState,
    ) -> Option<Candidate> {
        shared::repeat_last(view)
    }

    /// Reaction to the complaint flag.
    fn on_complaint_flag(
        &self,
        _view: &TurnView<'_>,
        _state: &ComponentState,
    ) -> Option<Candidate> {
        Some(shared::complaint_ack())
    }

    /// Reaction to the disinterest flag; the default is the shared disengage
    /// response.
    fn on_disinterest(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        Some(shared::disengage())
    }

    /// Reaction to the question flag while in control.
    fn on_question(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        None
    }

    /// Component-specific continuation checks, before node dispatch.
    fn continuation_check(
        &self,
        _view: &TurnView<'_>,
        _state: &ComponentState,
    ) -> Option<Candidate> {
        None
    }

    /// Response to a trigger word/template match while yielding.
    fn on_trigger(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        None
    }

    /// Component-specific introductory check while yielding.
    fn introductory_check(
        &self,
        _view: &TurnView<'_>,
        _state: &ComponentState,
    ) -> Option<Candidate> {
        None
    }

    /// Component activation checks, the last yielding step.
    fn activation_check(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        None
    }

    /// Checks that run after both branches.
    fn post_check(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Option<Candidate> {
        None
    }

    /// This component's "no usable response" candidate.
    fn no_response(&self) -> Candidate {
        Candidate::no_response()
    }

    /// This component's prompt offer for prompt arbitration.
    fn offer_prompt(&self, _view: &TurnView<'_>, _state: &ComponentState) -> Candidate {
        Candidate::no_prompt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_word_matches_tokens_not_substrings() {
        let triggers = TriggerSet::new().with_words(["cat", "dog"]);
        assert!(triggers.matches("I have a CAT at home."));
        assert!(!triggers.matches("that was catastrophic"));
    }

    #[test]
    fn test_trigger_phrase_is_substring_match() {
        let triggers = TriggerSet::new().with_phrase("talk about music");
        assert!(triggers.matches("can we talk about music please"));
        assert!(!triggers.matches("can we talk about films"));
    }

    #[test]
    fn test_trigger_pattern_injection() {
        let triggers = TriggerSet::new()
            .with_pattern(Arc::new(|u: &str| u.starts_with("news")));
        assert!(triggers.matches("News about the election"));
        assert!(!triggers.matches("the news today"));
    }
}
