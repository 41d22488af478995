//! Turn-global classification flags
//!
//! Booleans computed once per turn from the user utterance by NLU
//! collaborators (classification itself is outside this core). All components
//! observe the same immutable flag set; flags are read-only during ranking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Abrupt user-initiative signals, checked in a fixed order while a component
/// holds control (step 3b of the turn protocol). First present signal wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UserInitiative {
    /// Weather or time small talk.
    SmallTalk,
    /// "Say that again" style requests.
    RepetitionRequest,
    /// The user corrects how the bot addresses them.
    NameCorrection,
    /// The user was cut off mid-utterance.
    CutOffRecovery,
    /// "What do you mean?" clarification requests.
    Clarification,
    /// "Can you ...?" ability questions.
    AbilityQuestion,
    /// Personal questions about the bot.
    PersonalQuestion,
    /// The user interrupts the current flow.
    Interruption,
    /// Open chit-chat.
    ChitChat,
    /// "Tell me a story" requests.
    StoryRequest,
    /// The user discloses something personal; hand off to a listener.
    PersonalDisclosure,
    /// Generic "let's talk about anything" catch-all.
    Anything,
}

impl UserInitiative {
    /// The fixed check order of the initiative table.
    pub const TABLE: [UserInitiative; 12] = [
        UserInitiative::SmallTalk,
        UserInitiative::RepetitionRequest,
        UserInitiative::NameCorrection,
        UserInitiative::CutOffRecovery,
        UserInitiative::Clarification,
        UserInitiative::AbilityQuestion,
        UserInitiative::PersonalQuestion,
        UserInitiative::Interruption,
        UserInitiative::ChitChat,
        UserInitiative::StoryRequest,
        UserInitiative::PersonalDisclosure,
        UserInitiative::Anything,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            UserInitiative::SmallTalk => "small_talk",
            UserInitiative::RepetitionRequest => "repetition_request",
            UserInitiative::NameCorrection => "name_correction",
            UserInitiative::CutOffRecovery => "cut_off_recovery",
            UserInitiative::Clarification => "clarification",
            UserInitiative::AbilityQuestion => "ability_question",
            UserInitiative::PersonalQuestion => "personal_question",
            UserInitiative::Interruption => "interruption",
            UserInitiative::ChitChat => "chit_chat",
            UserInitiative::StoryRequest => "story_request",
            UserInitiative::PersonalDisclosure => "personal_disclosure",
            UserInitiative::Anything => "anything",
        }
    }
}

impl std::fmt::Display for UserInitiative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The turn's classification flags, produced by NLU collaborators and
/// consumed read-only by every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TurnFlags {
    /// The utterance is a question.
    #[serde(default)]
    pub question: bool,
    /// The user sounds disengaged from the current topic.
    #[serde(default)]
    pub disinterested: bool,
    /// The user asked to change topic.
    #[serde(default)]
    pub change_topic: bool,
    /// The user asked the bot to repeat itself.
    #[serde(default)]
    pub repeat_request: bool,
    /// The user complained about the bot.
    #[serde(default)]
    pub complaint: bool,
    /// Detected abrupt-initiative signals.
    #[serde(default)]
    pub initiatives: BTreeSet<UserInitiative>,
}

impl TurnFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_question(mut self) -> Self {
        self.question = true;
        self
    }

    pub fn with_disinterest(mut self) -> Self {
        self.disinterested = true;
        self
    }

    pub fn with_change_topic(mut self) -> Self {
        self.change_topic = true;
        self
    }

    pub fn with_repeat_request(mut self) -> Self {
        self.repeat_request = true;
        self
    }

    pub fn with_complaint(mut self) -> Self {
        self.complaint = true;
        self
    }

    pub fn with_initiative(mut self, initiative: UserInitiative) -> Self {
        self.initiatives.insert(initiative);
        self
    }

    pub fn has_initiative(&self, initiative: UserInitiative) -> bool {
        self.initiatives.contains(&initiative)
    }

    /// First initiative signal present, in table order.
    pub fn first_initiative(&self) -> Option<UserInitiative> {
        UserInitiative::TABLE
            .iter()
            .copied()
            .find(|i| self.initiatives.contains(i))
    }
}
