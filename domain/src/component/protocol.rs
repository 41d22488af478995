//! The uniform per-component turn protocol
//!
//! Every component runs the same ordered state machine each turn. The first
//! step producing a candidate wins; each step may return "no answer" and fall
//! through to the next. Which branch runs is determined by comparing the
//! previous turn's controlling identity with the component's own name.

use super::{ChangeTopicOutcome, DialogueComponent, shared};
use crate::candidate::Candidate;
use crate::context::TurnView;
use crate::flags::UserInitiative;
use crate::node::{NodePointer, dispatch};
use crate::state::{ComponentState, FieldUpdate, ResetPolicy};
use tracing::debug;

/// Run one component's turn and return its single candidate.
///
/// Ordered steps:
/// 1. pre-checks (control-independent);
/// 2. while continuing, the change-topic flag lets the component decline,
///    answer, or relinquish control (re-entering the yielding branch with a
///    lost-control state);
/// 3. while continuing: complaint detection, the abrupt user-initiative
///    table, the repeat/complaint/disinterest/question flags, continuation
///    checks, then node dispatch from the persisted pointer;
/// 4. while yielding: never-follow veto, trigger match, current-topic-entity
///    match, introductory check, activation checks;
/// 5. post-checks;
/// 6. the component's own "no" candidate.
///
/// Side effect on the way out: when the produced candidate does not request
/// an external prompt but the queued next node has an internal prompt, the
/// node prompt is appended and merged into the single outgoing candidate.
pub fn run_component_turn(
    component: &dyn DialogueComponent,
    state: &ComponentState,
    view: &TurnView<'_>,
) -> Candidate {
    // Step 1: pre-checks.
    if let Some(candidate) = component.pre_check(view, state) {
        return finalize(component, state, view, candidate);
    }

    if view.status.is_continuing() {
        // Step 2: change-topic negotiation.
        if view.flags.change_topic {
            match component.on_change_topic(view, state) {
                ChangeTopicOutcome::Decline => {}
                ChangeTopicOutcome::Respond(candidate) => {
                    return finalize(component, state, view, candidate);
                }
                ChangeTopicOutcome::Relinquish => {
                    debug!(component = %component.name(), "relinquishing control on topic change");
                    let policy = component.config().reset_policy;
                    let mut lost = state.clone();
                    lost.apply_if_not_chosen(policy);
                    let candidate = yielding_steps(component, &lost, view)
                        .or_else(|| component.post_check(view, &lost))
                        .map(|candidate| carry_reset(candidate, policy))
                        .unwrap_or_else(|| component.no_response());
                    return finalize(component, &lost, view, candidate);
                }
            }
        }

        // Step 3: continuing chain.
        if let Some(candidate) = continuing_steps(component, state, view) {
            return finalize(component, state, view, candidate);
        }
    } else if let Some(candidate) = yielding_steps(component, state, view) {
        // Step 4: yielding chain.
        return finalize(component, state, view, candidate);
    }

    // Step 5: post-checks.
    if let Some(candidate) = component.post_check(view, state) {
        return finalize(component, state, view, candidate);
    }

    // Step 6: nothing to say.
    component.no_response()
}

fn continuing_steps(
    component: &dyn DialogueComponent,
    state: &ComponentState,
    view: &TurnView<'_>,
) -> Option<Candidate> {
    // (a) component-specific complaint detection
    if let Some(candidate) = component.detect_complaint(view, state) {
        return Some(candidate);
    }

    // (b) abrupt user initiative, fixed table order
    for kind in UserInitiative::TABLE {
        if view.flags.has_initiative(kind)
            && let Some(candidate) = component.on_initiative(kind, view, state)
        {
            debug!(component = %component.name(), initiative = %kind, "initiative handled");
            return Some(candidate);
        }
    }

    // (c) repeat-request flag
    if view.flags.repeat_request
        && let Some(candidate) = component.on_repeat_request(view, state)
    {
        return Some(candidate);
    }

    // (d) complaint flag
    if view.flags.complaint
        && let Some(candidate) = component.on_complaint_flag(view, state)
    {
        return Some(candidate);
    }

    // (e) disinterest flag
    if view.flags.disinterested
        && let Some(candidate) = component.on_disinterest(view, state)
    {
        return Some(candidate);
    }

    // (f) question flag
    if view.flags.question
        && let Some(candidate) = component.on_question(view, state)
    {
        return Some(candidate);
    }

    // (g) component continuation checks
    if let Some(candidate) = component.continuation_check(view, state) {
        return Some(candidate);
    }

    // (h) resume the node graph from the persisted pointer
    dispatch::dispatch_next_node(
        component.name(),
        component.nodes(),
        component.transitions(),
        state,
        view,
    )
}

fn yielding_steps(
    component: &dyn DialogueComponent,
    state: &ComponentState,
    view: &TurnView<'_>,
) -> Option<Candidate> {
    // (a) never-follow veto: answer with the shared fallback and stop
    if let Some(previous) = view.controller
        && component.config().never_follow.contains(previous)
    {
        debug!(
            component = %component.name(),
            previous = %previous,
            "refusing to follow blacklisted controller"
        );
        return Some(shared::universal_fallback(view.turn_index));
    }

    // (b) trigger word/template match
    if component.config().triggers.matches(view.utterance())
        && let Some(candidate) = component.on_trigger(view, state)
    {
        return Some(candidate);
    }

    // (c) current-topic entity against node trigger categories
    if let Some(entity) = &view.context.tracked_entity
        && let Some(category) = &entity.category
        && let Some(node) = component.nodes().node_for_category(category)
        && let Some(candidate) = node.respond(view, state)
    {
        debug!(
            component = %component.name(),
            node = %node.name(),
            category = %category,
            "entity category pulled component in"
        );
        return Some(candidate);
    }

    // (d) component-specific introductory check
    if let Some(candidate) = component.introductory_check(view, state) {
        return Some(candidate);
    }

    // (e) activation checks
    component.activation_check(view, state)
}

/// Carry the lost-control reset on the candidate itself: pointer updates are
/// forced to empty unless the yielding steps already set them, and a full
/// reset policy marks the named fields for clearing. The reset must travel
/// with the update because a re-won turn merges into the persisted state,
/// which was never reset.
fn carry_reset(mut candidate: Candidate, policy: ResetPolicy) -> Candidate {
    if candidate.update.current_node.is_keep() {
        candidate.update.current_node = FieldUpdate::Set(NodePointer::Empty);
    }
    if candidate.update.next_node.is_keep() {
        candidate.update.next_node = FieldUpdate::Set(NodePointer::Empty);
    }
    if policy == ResetPolicy::Full {
        candidate.update.reset_fields = true;
    }
    candidate
}

/// Internal response+prompt chaining: append the queued node's prompt to a
/// candidate that is not asking arbitration for one.
fn finalize(
    component: &dyn DialogueComponent,
    state: &ComponentState,
    view: &TurnView<'_>,
    mut candidate: Candidate,
) -> Candidate {
    if !candidate.is_usable() || candidate.needs_prompt {
        return candidate;
    }
    let queued = match &candidate.update.next_node {
        FieldUpdate::Set(pointer) => pointer.clone(),
        FieldUpdate::Keep => state.next_node.clone(),
    };
    if let NodePointer::Node(name) = queued
        && let Some(prompt) =
            dispatch::node_prompt(component.name(), component.nodes(), &name, view, state)
    {
        debug!(component = %component.name(), node = %name, "chaining internal node prompt");
        candidate = candidate.chain_prompt(prompt);
    }
    candidate
}
