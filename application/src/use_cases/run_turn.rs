//! The per-turn arbitration use case
//!
//! One logical worker runs the whole turn: every registered component is
//! called sequentially and synchronously, response ranking selects the turn's
//! speaker, prompt ranking selects the follow-up when one was requested, and
//! exactly one merge call per component persists the outcome. Components
//! never communicate directly; they coordinate only through the
//! controlling-identity record and the turn flags, both written once per turn
//! here.

use crate::ports::conversation_store::{ConversationStore, StoreError};
use crate::ports::turn_logger::{NoTurnLogger, TurnEvent, TurnLogger};
use parley_domain::candidate::Candidate;
use parley_domain::component::{ComponentRegistry, run_component_turn};
use parley_domain::context::{AnnotationRegistry, ControlStatus, Exchange, TurnContext, TurnView};
use parley_domain::core::{ArbitrationError, ComponentName, Entity};
use parley_domain::flags::TurnFlags;
use parley_domain::ranking::{
    PromptPreferences, RankedSet, rank_prompts, rank_responses, rank_responses_unchecked,
};
use parley_domain::state::StateUpdate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors from the turn use case.
#[derive(Error, Debug)]
pub enum RunTurnError {
    #[error("no components registered")]
    NoComponents,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Arbitration(#[from] ArbitrationError),
}

/// One turn's input, assembled by the caller from transport and NLU output.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub conversation_id: String,
    pub utterance: String,
    pub flags: TurnFlags,
    pub history: Vec<Exchange>,
    pub tracked_entity: Option<Entity>,
    pub annotations: AnnotationRegistry,
}

impl TurnRequest {
    pub fn new(conversation_id: impl Into<String>, utterance: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            utterance: utterance.into(),
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: TurnFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_history(mut self, history: Vec<Exchange>) -> Self {
        self.history = history;
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.tracked_entity = Some(entity);
        self
    }

    pub fn with_annotations(mut self, annotations: AnnotationRegistry) -> Self {
        self.annotations = annotations;
        self
    }
}

/// What the turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The full outgoing utterance (response plus appended prompt, if any).
    pub reply: String,
    /// Component whose response was selected.
    pub response_winner: ComponentName,
    /// Component whose prompt was appended, when one was.
    pub prompt_winner: Option<ComponentName>,
    /// The controlling component for the next turn.
    pub controller: ComponentName,
    /// Index of the turn that just ran.
    pub turn_index: u64,
    /// Full response ranking, top-1 selected.
    pub responses: RankedSet,
    /// Full prompt ranking, when prompt arbitration ran.
    pub prompts: Option<RankedSet>,
}

/// Runs one conversational turn end to end.
///
/// # Example
///
/// ```no_run
/// use parley_application::{TurnRequest, TurnRunner};
/// # fn demo(registry: parley_domain::ComponentRegistry,
/// #         store: impl parley_application::ConversationStore) {
/// let mut runner = TurnRunner::new(registry, store).with_seed(7);
/// let outcome = runner
///     .run(&TurnRequest::new("conv-1", "hello there"))
///     .unwrap();
/// println!("{}", outcome.reply);
/// # }
/// ```
pub struct TurnRunner<S> {
    registry: ComponentRegistry,
    store: S,
    logger: Arc<dyn TurnLogger>,
    preferences: PromptPreferences,
    launch: Option<ComponentName>,
    forced_prompt: Option<ComponentName>,
    rng: StdRng,
}

impl<S: ConversationStore> TurnRunner<S> {
    pub fn new(registry: ComponentRegistry, store: S) -> Self {
        Self {
            registry,
            store,
            logger: Arc::new(NoTurnLogger),
            preferences: PromptPreferences::default(),
            launch: None,
            forced_prompt: None,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_preferences(mut self, preferences: PromptPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Name the launch component whose opening line is mandatory on turn one.
    pub fn with_launch(mut self, launch: impl Into<ComponentName>) -> Self {
        self.launch = Some(launch.into());
        self
    }

    /// Test-only override forcing prompt selection to one component.
    pub fn with_forced_prompt(mut self, component: impl Into<ComponentName>) -> Self {
        self.forced_prompt = Some(component.into());
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn TurnLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Fix the arbitration RNG seed; ranking is deterministic under a fixed
    /// seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run one turn: collect, rank, select, merge, persist.
    pub fn run(&mut self, request: &TurnRequest) -> Result<TurnOutcome, RunTurnError> {
        if self.registry.is_empty() {
            return Err(RunTurnError::NoComponents);
        }

        let mut record = self.store.load(&request.conversation_id)?;
        let turn_index = record.turn_index;
        let context = TurnContext {
            utterance: request.utterance.clone(),
            history: request.history.clone(),
            tracked_entity: request.tracked_entity.clone(),
            annotations: request.annotations.clone(),
        };

        // Collect one response candidate per component.
        let mut responses: BTreeMap<ComponentName, Candidate> = BTreeMap::new();
        for component in self.registry.iter() {
            let name = component.name().clone();
            let state = record.states.get(&name).cloned().unwrap_or_default();
            let view = TurnView {
                turn_index,
                flags: &request.flags,
                context: &context,
                controller: record.controller.as_ref(),
                status: ControlStatus::of(&name, record.controller.as_ref()),
            };
            let candidate = run_component_turn(component.as_ref(), &state, &view);
            debug!(component = %name, rank = %candidate.rank, "collected response candidate");
            responses.insert(name, candidate);
        }

        let tie_breaks = self.registry.tie_breaks();
        let first_turn = turn_index == 0;
        let ranked = match rank_responses(
            responses.clone(),
            &tie_breaks,
            self.launch.as_ref(),
            first_turn,
        ) {
            Ok(ranked) => ranked,
            Err(err @ ArbitrationError::MissingFallback { .. }) => {
                error!(%err, "mandatory fallback component absent; ranking without it");
                rank_responses_unchecked(responses, &tie_breaks, self.launch.as_ref(), first_turn)
            }
            Err(err) => return Err(err.into()),
        };

        let (winner_name, winner) = ranked
            .winner()
            .map(|(n, c)| (n.clone(), c.clone()))
            .ok_or(ArbitrationError::EmptyCandidateSet)?;

        // Prompt arbitration, only when the selected response asks for it.
        let mut prompt_ranking = None;
        let mut appended_prompt: Option<(ComponentName, Candidate)> = None;
        if winner.needs_prompt {
            let mut prompts: BTreeMap<ComponentName, Candidate> = BTreeMap::new();
            for component in self.registry.iter() {
                let name = component.name().clone();
                let state = record.states.get(&name).cloned().unwrap_or_default();
                let view = TurnView {
                    turn_index,
                    flags: &request.flags,
                    context: &context,
                    controller: record.controller.as_ref(),
                    status: ControlStatus::of(&name, record.controller.as_ref()),
                };
                prompts.insert(name, component.offer_prompt(&view, &state));
            }
            let recency = record.recency(self.registry.names());
            let ranked_prompts = rank_prompts(
                prompts,
                &self.preferences,
                Some(&recency),
                self.forced_prompt.as_ref(),
                &mut self.rng,
            )?;
            if let Some((name, prompt)) = ranked_prompts.winner()
                && prompt.is_usable()
            {
                appended_prompt = Some((name.clone(), prompt.clone()));
            }
            prompt_ranking = Some(ranked_prompts);
        }

        let mut reply = winner.text.clone();
        if let Some((_, prompt)) = &appended_prompt {
            reply.push(' ');
            reply.push_str(&prompt.text);
        }

        // The controlling component: the prompt owner when a prompt was
        // appended, else the response winner.
        let controller = appended_prompt
            .as_ref()
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| winner_name.clone());

        // Merge protocol: exactly one call per component.
        let mut chosen_updates: BTreeMap<ComponentName, StateUpdate> = BTreeMap::new();
        chosen_updates.insert(winner_name.clone(), winner.update.clone());
        if let Some((name, prompt)) = &appended_prompt {
            chosen_updates
                .entry(name.clone())
                .and_modify(|update| *update = update.clone().merged_with(prompt.update.clone()))
                .or_insert_with(|| prompt.update.clone());
        }
        for component in self.registry.iter() {
            let name = component.name().clone();
            let policy = component.config().reset_policy;
            let state = record.state_mut(&name);
            match chosen_updates.get(&name) {
                Some(update) => {
                    state.apply_if_chosen(update, turn_index);
                    record.mark_spoken(&name, turn_index);
                }
                None => state.apply_if_not_chosen(policy),
            }
        }

        record.controller = Some(controller.clone());
        record.turn_index = turn_index + 1;
        self.store.save(&request.conversation_id, &record)?;

        info!(
            turn = turn_index,
            winner = %winner_name,
            prompt = appended_prompt.as_ref().map(|(n, _)| n.as_str()),
            controller = %controller,
            "turn arbitrated"
        );
        self.logger.log(TurnEvent {
            conversation_id: request.conversation_id.clone(),
            turn: turn_index,
            utterance: request.utterance.clone(),
            reply: reply.clone(),
            response_winner: winner_name.clone(),
            prompt_winner: appended_prompt.as_ref().map(|(n, _)| n.clone()),
            controller: controller.clone(),
            response_ranking: TurnEvent::ranking_entries(&ranked),
            prompt_ranking: prompt_ranking.as_ref().map(TurnEvent::ranking_entries),
        });

        Ok(TurnOutcome {
            reply,
            response_winner: winner_name,
            prompt_winner: appended_prompt.map(|(name, _)| name),
            controller,
            turn_index,
            responses: ranked,
            prompts: prompt_ranking,
        })
    }
}
