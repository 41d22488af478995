//! Priority and tie-break model
//!
//! Two independent strict-priority axes order candidates: [`Priority`] for
//! responses and [`PromptType`] for follow-up prompts. Within one priority
//! level, candidates are ordered by a fixed per-component [`TieBreak`]. The
//! single dynamic exception is the conversation's first turn, where the launch
//! component's tie-break is forced above all others in its group so the
//! opening line always wins its tie.

use serde::{Deserialize, Serialize};

/// Response priority levels, lowest to highest.
///
/// `No` means "no usable response"; every component must be able to return a
/// `No` candidate so the arbitration input is never empty.
///
/// # Example
///
/// ```
/// use parley_domain::priority::Priority;
///
/// assert!(Priority::ForceStart > Priority::StrongContinue);
/// assert!(Priority::UniversalFallback > Priority::No);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// No usable response.
    #[default]
    No,
    /// Generic last-resort response; exactly this level satisfies the
    /// mandatory-fallback requirement of response ranking.
    UniversalFallback,
    /// Weak continuation of a topic already in progress.
    WeakContinue,
    /// Able to start a new topic.
    CanStart,
    /// Strong continuation of the current topic.
    StrongContinue,
    /// Must speak, overriding everything else.
    ForceStart,
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Priority::No => "no",
            Priority::UniversalFallback => "universal_fallback",
            Priority::WeakContinue => "weak_continue",
            Priority::CanStart => "can_start",
            Priority::StrongContinue => "strong_continue",
            Priority::ForceStart => "force_start",
        }
    }

    /// Check whether this priority carries a usable response.
    pub fn is_usable(&self) -> bool {
        *self != Priority::No
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no" => Ok(Priority::No),
            "universal_fallback" => Ok(Priority::UniversalFallback),
            "weak_continue" => Ok(Priority::WeakContinue),
            "can_start" => Ok(Priority::CanStart),
            "strong_continue" => Ok(Priority::StrongContinue),
            "force_start" => Ok(Priority::ForceStart),
            _ => Err(format!("unknown priority: {}", s)),
        }
    }
}

/// Prompt type levels, lowest to highest. Independent axis, used only for
/// follow-up prompts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    /// No prompt offered.
    #[default]
    No,
    /// Topic-agnostic prompt ("What would you like to talk about?").
    Generic,
    /// Prompt related to the conversational context.
    Contextual,
    /// Prompt continuing the current topic.
    CurrentTopic,
    /// Prompt that must be asked.
    ForceStart,
}

impl PromptType {
    pub fn as_str(&self) -> &str {
        match self {
            PromptType::No => "no",
            PromptType::Generic => "generic",
            PromptType::Contextual => "contextual",
            PromptType::CurrentTopic => "current_topic",
            PromptType::ForceStart => "force_start",
        }
    }

    /// Check whether this is an actual prompt offer.
    pub fn is_offered(&self) -> bool {
        *self != PromptType::No
    }
}

impl std::fmt::Display for PromptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PromptType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no" => Ok(PromptType::No),
            "generic" => Ok(PromptType::Generic),
            "contextual" => Ok(PromptType::Contextual),
            "current_topic" => Ok(PromptType::CurrentTopic),
            "force_start" => Ok(PromptType::ForceStart),
            _ => Err(format!("unknown prompt type: {}", s)),
        }
    }
}

/// Fixed per-component rank ordering candidates within one priority level.
///
/// Higher wins. Configured once per component; the whole `i32` range is
/// legal. The first-turn launch override is compared ahead of the tie-break
/// by response ranking, so no configured value can pre-empt the opening
/// line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TieBreak(pub i32);

impl TieBreak {
    pub fn new(rank: i32) -> Self {
        Self(rank)
    }
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
