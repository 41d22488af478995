//! Candidate utterances
//!
//! A [`Candidate`] is one component's proposed response or prompt for the
//! current turn, together with the sparse state update the component wants
//! persisted if it wins arbitration.

use crate::core::{ArbitrationError, ComponentName, Entity};
use crate::priority::{Priority, PromptType};
use crate::state::StateUpdate;
use serde::{Deserialize, Serialize};

/// Which arbitration axis a candidate competes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Response(Priority),
    Prompt(PromptType),
}

impl Rank {
    /// Check whether the candidate carries usable text.
    pub fn is_usable(&self) -> bool {
        match self {
            Rank::Response(p) => p.is_usable(),
            Rank::Prompt(t) => t.is_offered(),
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rank::Response(p) => write!(f, "response/{}", p),
            Rank::Prompt(t) => write!(f, "prompt/{}", t),
        }
    }
}

/// Coarse tag describing what kind of answer the text is, consumed by
/// downstream selection and by prompt chaining.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    #[default]
    None,
    Statement,
    YesNoAnswer,
    Opinion,
    Factual,
    /// Steers the conversation toward another topic.
    Steer,
}

/// One component's proposed utterance for the turn.
///
/// Invariant: `text` is non-empty iff the rank is not `No`. Violations are
/// surfaced by [`Candidate::validate`] and asserted at ranking entry.
///
/// # Example
///
/// ```
/// use parley_domain::candidate::Candidate;
/// use parley_domain::priority::Priority;
///
/// let candidate = Candidate::response("I love jazz too!", Priority::StrongContinue)
///     .wanting_prompt();
/// assert!(candidate.is_usable());
/// assert!(candidate.needs_prompt);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// The text to speak; empty iff the rank is `No`.
    pub text: String,
    /// Priority (responses) or prompt type (prompts).
    pub rank: Rank,
    /// Whether a trailing prompt should be appended from prompt arbitration.
    pub needs_prompt: bool,
    /// Topic entity this candidate recommends tracking next.
    pub recommended_entity: Option<Entity>,
    /// What kind of answer the text is.
    pub answer_type: AnswerType,
    /// Sparse state update to merge if this candidate is chosen.
    pub update: StateUpdate,
}

impl Candidate {
    /// A response candidate at the given priority.
    pub fn response(text: impl Into<String>, priority: Priority) -> Self {
        Self {
            text: text.into(),
            rank: Rank::Response(priority),
            needs_prompt: false,
            recommended_entity: None,
            answer_type: AnswerType::default(),
            update: StateUpdate::none(),
        }
    }

    /// A prompt candidate of the given type.
    pub fn prompt(text: impl Into<String>, prompt_type: PromptType) -> Self {
        Self {
            text: text.into(),
            rank: Rank::Prompt(prompt_type),
            needs_prompt: false,
            recommended_entity: None,
            answer_type: AnswerType::default(),
            update: StateUpdate::none(),
        }
    }

    /// The component's "no usable response" candidate.
    pub fn no_response() -> Self {
        Self::response("", Priority::No)
    }

    /// The component's "no prompt offered" candidate.
    pub fn no_prompt() -> Self {
        Self::prompt("", PromptType::No)
    }

    pub fn wanting_prompt(mut self) -> Self {
        self.needs_prompt = true;
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.recommended_entity = Some(entity);
        self
    }

    pub fn with_answer_type(mut self, answer_type: AnswerType) -> Self {
        self.answer_type = answer_type;
        self
    }

    pub fn with_update(mut self, update: StateUpdate) -> Self {
        self.update = update;
        self
    }

    /// Response priority, if this is a response candidate.
    pub fn priority(&self) -> Option<Priority> {
        match self.rank {
            Rank::Response(p) => Some(p),
            Rank::Prompt(_) => None,
        }
    }

    /// Prompt type, if this is a prompt candidate.
    pub fn prompt_type(&self) -> Option<PromptType> {
        match self.rank {
            Rank::Prompt(t) => Some(t),
            Rank::Response(_) => None,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.rank.is_usable()
    }

    /// Enforce the text/rank invariant.
    pub fn validate(&self, component: &ComponentName) -> Result<(), ArbitrationError> {
        let text_empty = self.text.trim().is_empty();
        if self.rank.is_usable() && text_empty {
            return Err(ArbitrationError::InvalidCandidate {
                component: component.clone(),
                reason: format!("empty text at rank {}", self.rank),
            });
        }
        if !self.rank.is_usable() && !text_empty {
            return Err(ArbitrationError::InvalidCandidate {
                component: component.clone(),
                reason: "text present on a 'no' candidate".to_string(),
            });
        }
        Ok(())
    }

    /// Fold an internally chained node prompt into this candidate: append its
    /// text and merge its update, entity, and answer type.
    pub fn chain_prompt(mut self, prompt: Candidate) -> Self {
        if !prompt.text.is_empty() {
            if !self.text.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(&prompt.text);
        }
        if prompt.recommended_entity.is_some() {
            self.recommended_entity = prompt.recommended_entity;
        }
        if prompt.answer_type != AnswerType::None {
            self.answer_type = prompt.answer_type;
        }
        self.update = self.update.merged_with(prompt.update);
        self
    }
}
