//! Assembly of a configured turn runner.
//!
//! The embedding host loads a [`FileConfig`] through [`crate::ConfigLoader`],
//! compiles each component's file section with [`component_config`], and
//! hands the registry to [`assemble`], which applies the arbiter-wide
//! settings: prompt distributions, the launch component, the RNG seed, the
//! forced-prompt override, and the JSONL transcript destination. Annotation
//! producers are spawned separately per turn with
//! [`FileArbiterConfig::annotation_timeout`].
//!
//! [`FileArbiterConfig::annotation_timeout`]: crate::FileArbiterConfig::annotation_timeout

use crate::config::FileConfig;
use crate::logging::JsonlTurnLogger;
use parley_application::{ConversationStore, TurnRunner};
use parley_domain::ComponentRegistry;
use parley_domain::component::ComponentConfig;
use std::sync::Arc;
use tracing::info;

/// Build a turn runner with every arbiter-wide file setting applied.
///
/// A transcript path that cannot be created is skipped with a warning from
/// the logger constructor; the runner still works without it.
pub fn assemble<S: ConversationStore>(
    config: FileConfig,
    registry: ComponentRegistry,
    store: S,
) -> TurnRunner<S> {
    let FileConfig {
        arbiter, prompts, ..
    } = config;

    let mut runner = TurnRunner::new(registry, store).with_preferences(prompts.into_preferences());
    if let Some(launch) = arbiter.launch {
        runner = runner.with_launch(launch);
    }
    if let Some(seed) = arbiter.seed {
        runner = runner.with_seed(seed);
    }
    if let Some(forced) = arbiter.forced_prompt {
        runner = runner.with_forced_prompt(forced);
    }
    if let Some(path) = arbiter.log_path
        && let Some(logger) = JsonlTurnLogger::create(path)
    {
        info!(path = %logger.path().display(), "turn transcript enabled");
        runner = runner.with_logger(Arc::new(logger));
    }
    runner
}

/// Compile the file section for one component, when the file has one.
pub fn component_config(config: &FileConfig, component: &str) -> Option<ComponentConfig> {
    config
        .components
        .get(component)
        .cloned()
        .map(|section| section.into_component_config(component))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{FallbackComponent, GreeterComponent};
    use crate::store::InMemoryConversationStore;
    use parley_application::TurnRequest;
    use parley_domain::core::ComponentName;

    fn config_from(toml: &str) -> FileConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_assemble_applies_launch_and_seed() {
        let config = config_from(
            r#"
            [arbiter]
            launch = "greeter"
            seed = 7

            [prompts.types]
            generic = 1.0

            [prompts.components.generic]
            fallback = 1.0

            [components.fallback]
            tie_break = -1
            "#,
        );
        let fallback = FallbackComponent::new()
            .with_config(component_config(&config, "fallback").unwrap());
        let registry = ComponentRegistry::new()
            .with(Arc::new(GreeterComponent::new()))
            .with(Arc::new(fallback));

        let mut runner = assemble(config, registry, InMemoryConversationStore::new());
        let outcome = runner.run(&TurnRequest::new("c1", "good evening")).unwrap();
        assert_eq!(outcome.response_winner, ComponentName::from("greeter"));
    }

    #[test]
    fn test_component_config_compiles_known_sections_only() {
        let config = config_from(
            r#"
            [components.greeter]
            tie_break = 4
            trigger_words = ["bonjour"]
            "#,
        );
        let compiled = component_config(&config, "greeter").unwrap();
        assert!(compiled.triggers.matches("bonjour tout le monde"));
        assert!(component_config(&config, "news").is_none());
    }
}
