//! Shared canned responses
//!
//! Small set of topic-agnostic utterances the turn protocol falls back on:
//! the universal fallback, the disengage line for disinterested users, the
//! complaint acknowledgement, the repeat answer, and the exit hand-off.
//! Components with richer phrasing override the corresponding hooks instead.

use crate::candidate::{AnswerType, Candidate};
use crate::context::{HANDOFF_ANNOTATION, TurnView};
use crate::node::NodePointer;
use crate::priority::Priority;
use crate::state::StateUpdate;

const FALLBACK_LINES: [&str; 4] = [
    "I'm not sure I caught that.",
    "Interesting! Tell me more.",
    "I don't know much about that yet.",
    "Let's see... I'm not sure what to say to that.",
];

const HANDOFF_LINES: [&str; 3] = [
    "That was fun to talk about.",
    "Thanks for chatting about that with me.",
    "Good talk!",
];

/// The shared last-resort response. Deterministic per turn index so repeated
/// fallbacks do not loop on one phrase.
pub fn universal_fallback(turn_index: u64) -> Candidate {
    let line = FALLBACK_LINES[(turn_index as usize) % FALLBACK_LINES.len()];
    Candidate::response(line, Priority::UniversalFallback).wanting_prompt()
}

/// Shared disengage response for a disinterested user: close the topic and
/// ask prompt arbitration for somewhere else to go.
pub fn disengage() -> Candidate {
    Candidate::response("Fair enough, we can leave that there.", Priority::StrongContinue)
        .wanting_prompt()
        .with_update(
            StateUpdate::none()
                .with_current_node(NodePointer::Empty)
                .with_next_node(NodePointer::Empty),
        )
}

/// Shared complaint acknowledgement; keeps the component's flow queued.
pub fn complaint_ack() -> Candidate {
    Candidate::response(
        "Sorry about that, I'm still learning.",
        Priority::StrongContinue,
    )
    .wanting_prompt()
}

/// Repeat the bot's previous reply, when one exists.
pub fn repeat_last(view: &TurnView<'_>) -> Option<Candidate> {
    view.context.last_reply().map(|reply| {
        Candidate::response(format!("I said: {}", reply), Priority::StrongContinue)
            .with_answer_type(AnswerType::Statement)
    })
}

/// The shared exit hand-off acknowledgement: leave the flow, prefer a cached
/// async-generated line, and request a prompt from elsewhere.
pub fn exit_handoff(view: &TurnView<'_>) -> Candidate {
    let line = view
        .context
        .annotations
        .get(HANDOFF_ANNOTATION)
        .and_then(|a| a.text)
        .unwrap_or_else(|| {
            HANDOFF_LINES[(view.turn_index as usize) % HANDOFF_LINES.len()].to_string()
        });
    Candidate::response(line, Priority::StrongContinue)
        .wanting_prompt()
        .with_update(
            StateUpdate::none()
                .with_current_node(NodePointer::Empty)
                .with_next_node(NodePointer::Empty),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Annotation, AnnotationRegistry, ControlStatus, ReadyAnnotation, TurnContext};
    use crate::flags::TurnFlags;
    use std::sync::Arc;

    fn view<'a>(flags: &'a TurnFlags, context: &'a TurnContext, turn_index: u64) -> TurnView<'a> {
        TurnView {
            turn_index,
            flags,
            context,
            controller: None,
            status: ControlStatus::Continuing,
        }
    }

    #[test]
    fn test_fallback_rotates_and_wants_prompt() {
        let a = universal_fallback(0);
        let b = universal_fallback(1);
        assert_ne!(a.text, b.text);
        assert!(a.needs_prompt);
        assert_eq!(a.priority(), Some(Priority::UniversalFallback));
    }

    #[test]
    fn test_exit_handoff_prefers_cached_annotation() {
        let flags = TurnFlags::new();
        let context = TurnContext::new("bye").with_annotations(AnnotationRegistry::new().with(
            HANDOFF_ANNOTATION,
            Arc::new(ReadyAnnotation(Annotation::text("Lovely chatting about jazz!"))),
        ));
        let candidate = exit_handoff(&view(&flags, &context, 2));
        assert_eq!(candidate.text, "Lovely chatting about jazz!");
        assert!(candidate.needs_prompt);
        assert!(!candidate.update.next_node.is_keep());
    }

    #[test]
    fn test_exit_handoff_without_annotation_uses_canned_line() {
        let flags = TurnFlags::new();
        let context = TurnContext::new("bye");
        let candidate = exit_handoff(&view(&flags, &context, 0));
        assert!(HANDOFF_LINES.contains(&candidate.text.as_str()));
    }

    #[test]
    fn test_repeat_needs_history() {
        let flags = TurnFlags::new();
        let context = TurnContext::new("what?");
        assert!(repeat_last(&view(&flags, &context, 1)).is_none());
    }
}
