//! End-to-end turn flow over the reference components.
//!
//! Drives a whole conversation through the turn runner with the greeter and
//! fallback components wired up the way an embedding host would do it.

use parley_application::{ConversationStore, TurnRequest, TurnRunner};
use parley_domain::ComponentRegistry;
use parley_domain::context::{Annotation, AnnotationRegistry, HANDOFF_ANNOTATION};
use parley_domain::core::ComponentName;
use parley_domain::node::NodePointer;
use parley_domain::priority::PromptType;
use parley_domain::ranking::PromptPreferences;
use parley_infrastructure::{
    FallbackComponent, GreeterComponent, InMemoryConversationStore, JsonlTurnLogger,
    SpawnedAnnotation,
};
use std::sync::Arc;

fn registry() -> ComponentRegistry {
    ComponentRegistry::new()
        .with(Arc::new(GreeterComponent::new()))
        .with(Arc::new(FallbackComponent::new()))
}

fn preferences() -> PromptPreferences {
    PromptPreferences::new()
        .with_type_weight(PromptType::Generic, 1.0)
        .with_type_weight(PromptType::Contextual, 3.0)
        .with_component_weight(PromptType::Generic, "fallback", 1.0)
        .with_component_weight(PromptType::Contextual, "greeter", 1.0)
}

#[test]
fn test_greeting_flow_from_launch_to_handoff() {
    let mut runner = TurnRunner::new(registry(), InMemoryConversationStore::new())
        .with_preferences(preferences())
        .with_launch("greeter")
        .with_seed(7);

    // Turn 0: the launch component opens and chains its name question.
    let outcome = runner.run(&TurnRequest::new("c1", "good evening")).unwrap();
    assert_eq!(outcome.response_winner, ComponentName::from("greeter"));
    assert!(outcome.reply.contains("Lovely to meet you"));
    assert!(outcome.reply.contains("What should I call you?"));
    assert_eq!(outcome.controller, ComponentName::from("greeter"));

    // Turn 1: the controlling greeter consumes the answer.
    let outcome = runner.run(&TurnRequest::new("c1", "my name is Ada")).unwrap();
    assert_eq!(outcome.response_winner, ComponentName::from("greeter"));
    assert!(outcome.reply.contains("Nice to meet you, Ada!"));

    // Turn 2: the transition table winds the flow down.
    let outcome = runner.run(&TurnRequest::new("c1", "okay then")).unwrap();
    assert_eq!(outcome.response_winner, ComponentName::from("greeter"));
    assert!(outcome.reply.contains("Ada"));
    assert!(outcome.reply.contains("introductions"));

    // Turn 3: exit hand-off; the fallback's generic prompt is appended and
    // control moves to the prompt owner.
    let outcome = runner.run(&TurnRequest::new("c1", "alright")).unwrap();
    assert_eq!(outcome.response_winner, ComponentName::from("greeter"));
    assert_eq!(outcome.prompt_winner, Some(ComponentName::from("fallback")));
    assert!(outcome.reply.contains("What would you like to talk about?"));
    assert_eq!(outcome.controller, ComponentName::from("fallback"));
}

#[test]
fn test_handoff_prefers_resolved_annotation() {
    let mut runner = TurnRunner::new(registry(), InMemoryConversationStore::new())
        .with_preferences(preferences())
        .with_launch("greeter")
        .with_seed(7);

    runner.run(&TurnRequest::new("c1", "hello")).unwrap();
    runner.run(&TurnRequest::new("c1", "call me Grace")).unwrap();
    runner.run(&TurnRequest::new("c1", "sure")).unwrap();

    let annotations = AnnotationRegistry::new().with(
        HANDOFF_ANNOTATION,
        Arc::new(SpawnedAnnotation::ready(Annotation::text(
            "It was a pleasure meeting you, Grace.",
        ))),
    );
    let outcome = runner
        .run(&TurnRequest::new("c1", "what else?").with_annotations(annotations))
        .unwrap();
    assert!(
        outcome
            .reply
            .starts_with("It was a pleasure meeting you, Grace.")
    );
}

#[test]
fn test_state_persists_across_turns() {
    let mut runner = TurnRunner::new(registry(), InMemoryConversationStore::new())
        .with_preferences(preferences())
        .with_launch("greeter")
        .with_seed(7);

    runner.run(&TurnRequest::new("c1", "hello")).unwrap();
    runner.run(&TurnRequest::new("c1", "I go by Linus")).unwrap();
    runner.run(&TurnRequest::new("c1", "right")).unwrap();
    runner.run(&TurnRequest::new("c1", "go on")).unwrap();

    // After the hand-off the greeter's flow pointers are cleared but its
    // learned fields survive.
    let outcome = runner.run(&TurnRequest::new("c1", "hmm")).unwrap();
    assert_eq!(outcome.response_winner, ComponentName::from("fallback"));
    assert_eq!(outcome.turn_index, 4);

    // A fresh conversation starts from scratch.
    let outcome = runner.run(&TurnRequest::new("c2", "hello")).unwrap();
    assert_eq!(outcome.turn_index, 0);
    assert!(outcome.reply.contains("What should I call you?"));
}

#[test]
fn test_fallback_alone_carries_a_conversation() {
    let registry = ComponentRegistry::new().with(Arc::new(FallbackComponent::new()));
    let mut runner = TurnRunner::new(registry, InMemoryConversationStore::new())
        .with_preferences(preferences())
        .with_seed(2);

    for utterance in ["zzz", "what", "keep going"] {
        let outcome = runner.run(&TurnRequest::new("c1", utterance)).unwrap();
        assert_eq!(outcome.response_winner, ComponentName::from("fallback"));
        assert!(!outcome.reply.is_empty());
    }
}

#[test]
fn test_turns_are_written_to_the_jsonl_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transcript.jsonl");
    let logger = Arc::new(JsonlTurnLogger::create(&path).unwrap());

    let mut runner = TurnRunner::new(registry(), InMemoryConversationStore::new())
        .with_preferences(preferences())
        .with_launch("greeter")
        .with_logger(logger)
        .with_seed(7);

    runner.run(&TurnRequest::new("c1", "hello")).unwrap();
    runner.run(&TurnRequest::new("c1", "I'm Ada")).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["turn"], 0);
    assert_eq!(first["response_winner"], "greeter");
    assert!(first["timestamp"].is_string());
    // the full ranking travels with the record, winner first
    let ranking = first["response_ranking"].as_array().unwrap();
    assert_eq!(ranking[0]["component"], "greeter");
}

#[test]
fn test_greeter_pointers_clear_after_handoff() {
    let store = InMemoryConversationStore::new();
    // Run the flow to completion against a shared store reference.
    let store = Arc::new(store);

    struct SharedStore(Arc<InMemoryConversationStore>);
    impl parley_application::ConversationStore for SharedStore {
        fn load(
            &self,
            conversation_id: &str,
        ) -> Result<parley_application::ConversationRecord, parley_application::StoreError>
        {
            self.0.load(conversation_id)
        }
        fn save(
            &self,
            conversation_id: &str,
            record: &parley_application::ConversationRecord,
        ) -> Result<(), parley_application::StoreError> {
            self.0.save(conversation_id, record)
        }
    }

    let mut runner = TurnRunner::new(registry(), SharedStore(store.clone()))
        .with_preferences(preferences())
        .with_launch("greeter")
        .with_seed(7);

    for utterance in ["hello", "call me Ada", "fine", "and now?"] {
        runner.run(&TurnRequest::new("c1", utterance)).unwrap();
    }

    let record = store.load("c1").unwrap();
    let greeter = &record.states[&ComponentName::from("greeter")];
    assert_eq!(greeter.next_node, NodePointer::Empty);
    assert_eq!(
        greeter.field("guest_name").and_then(|v| v.as_str()),
        Some("Ada")
    );
    assert_eq!(record.controller, Some(ComponentName::from("fallback")));
}
