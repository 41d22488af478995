//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain configuration
//! (prompt preferences, per-component trigger sets) via the `into_*` helpers.
//! Invalid entries are skipped with a warning rather than failing the load.

use parley_domain::component::{ComponentConfig, TriggerSet};
use parley_domain::priority::TieBreak;
use parley_domain::ranking::PromptPreferences;
use parley_domain::state::ResetPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Arbiter-wide settings
    pub arbiter: FileArbiterConfig,
    /// Prompt arbitration distributions
    pub prompts: FilePromptsConfig,
    /// Per-component settings, keyed by component name
    pub components: BTreeMap<String, FileComponentConfig>,
}

/// Arbiter-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileArbiterConfig {
    /// Component whose opening line wins the first turn's tie
    pub launch: Option<String>,
    /// Fixed RNG seed for reproducible prompt sampling
    pub seed: Option<u64>,
    /// Test hook: component whose prompt offer is always selected
    pub forced_prompt: Option<String>,
    /// How long an annotation resolution may block, in milliseconds
    pub annotation_timeout_ms: u64,
    /// JSONL turn transcript destination; `None` disables transcript logging
    pub log_path: Option<PathBuf>,
}

impl FileArbiterConfig {
    /// The annotation deadline, as annotation spawning consumes it.
    pub fn annotation_timeout(&self) -> Duration {
        Duration::from_millis(self.annotation_timeout_ms)
    }
}

impl Default for FileArbiterConfig {
    fn default() -> Self {
        Self {
            launch: None,
            seed: None,
            forced_prompt: None,
            annotation_timeout_ms: 1_000,
            log_path: None,
        }
    }
}

/// Prompt arbitration distributions (raw TOML structure)
///
/// Keys are prompt-type names (`generic`, `contextual`, `current_topic`,
/// `force_start`); weights are relative, not normalised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePromptsConfig {
    /// Weight per prompt type
    pub types: BTreeMap<String, f64>,
    /// Per-type weight per component
    pub components: BTreeMap<String, BTreeMap<String, f64>>,
}

impl FilePromptsConfig {
    /// Convert into domain prompt preferences, skipping unparseable
    /// prompt-type keys with a warning.
    pub fn into_preferences(self) -> PromptPreferences {
        let mut prefs = PromptPreferences::new();
        for (key, weight) in self.types {
            match key.parse() {
                Ok(prompt_type) => prefs = prefs.with_type_weight(prompt_type, weight),
                Err(e) => warn!("Ignoring prompt type weight [prompts.types.{}]: {}", key, e),
            }
        }
        for (key, weights) in self.components {
            let prompt_type = match key.parse() {
                Ok(t) => t,
                Err(e) => {
                    warn!("Ignoring component weights [prompts.components.{}]: {}", key, e);
                    continue;
                }
            };
            for (component, weight) in weights {
                prefs = prefs.with_component_weight(prompt_type, component, weight);
            }
        }
        prefs
    }
}

/// Reset behaviour applied when a component loses the turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileResetPolicy {
    /// Clear only the node pointers
    #[default]
    Pointers,
    /// Clear pointers, counter, and scratch fields
    Full,
}

impl From<FileResetPolicy> for ResetPolicy {
    fn from(value: FileResetPolicy) -> Self {
        match value {
            FileResetPolicy::Pointers => ResetPolicy::PointersOnly,
            FileResetPolicy::Full => ResetPolicy::Full,
        }
    }
}

/// Per-component settings (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileComponentConfig {
    /// Fixed rank within a priority group; higher wins ties
    pub tie_break: i32,
    /// Single words that trigger the component (token match)
    pub trigger_words: Vec<String>,
    /// Multi-word phrases that trigger the component (substring match)
    pub trigger_phrases: Vec<String>,
    /// Regex templates that trigger the component
    pub trigger_templates: Vec<String>,
    /// Components this one refuses to follow directly
    pub never_follow: Vec<String>,
    /// Reset behaviour when not chosen
    pub reset: FileResetPolicy,
}

impl FileComponentConfig {
    /// Compile into a domain component configuration.
    ///
    /// Regex templates are compiled here so the domain layer stays free of
    /// the regex dependency; templates that fail to compile are skipped with
    /// a warning.
    pub fn into_component_config(self, component: &str) -> ComponentConfig {
        let mut triggers = TriggerSet::new()
            .with_words(self.trigger_words);
        for phrase in self.trigger_phrases {
            triggers = triggers.with_phrase(phrase);
        }
        for template in self.trigger_templates {
            match regex::Regex::new(&template) {
                Ok(re) => {
                    triggers = triggers.with_pattern(Arc::new(move |u: &str| re.is_match(u)));
                }
                Err(e) => warn!(
                    "Ignoring trigger template {:?} for component {}: {}",
                    template, component, e
                ),
            }
        }

        let mut config = ComponentConfig::new(TieBreak::new(self.tie_break))
            .with_triggers(triggers)
            .with_reset_policy(self.reset.into());
        for name in self.never_follow {
            config = config.never_following(name);
        }
        config
    }
}
