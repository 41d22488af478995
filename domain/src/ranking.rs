//! Arbitration strategy: response and prompt ranking
//!
//! Pure functions turning the unordered per-component candidate maps into a
//! [`RankedSet`]. Response ranking is strict: (priority desc, tie-break desc)
//! with the first-turn launch override. Prompt ranking is weighted-random: a
//! strict top-1 rule would always favour the broadest-coverage component, so
//! a tunable preference distribution (optionally scaled by recency) picks the
//! prompt instead, preserving topic diversity. Both functions are total and
//! deterministic for a fixed RNG seed.

use crate::candidate::Candidate;
use crate::core::{ArbitrationError, ComponentName};
use crate::priority::{PromptType, Priority, TieBreak};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Candidates ordered by descending priority with deterministic tie-breaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RankedSet {
    entries: Vec<(ComponentName, Candidate)>,
}

impl RankedSet {
    fn from_entries(entries: Vec<(ComponentName, Candidate)>) -> Self {
        Self { entries }
    }

    /// The selected entry: the top of the order.
    pub fn winner(&self) -> Option<(&ComponentName, &Candidate)> {
        self.entries.first().map(|(n, c)| (n, c))
    }

    /// Remove a component's candidate, logging the removal.
    pub fn remove(&mut self, name: &ComponentName) -> Option<Candidate> {
        let position = self.entries.iter().position(|(n, _)| n == name)?;
        let (_, candidate) = self.entries.remove(position);
        debug!(component = %name, position, "removed candidate from ranked set");
        Some(candidate)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentName, &Candidate)> {
        self.entries.iter().map(|(n, c)| (n, c))
    }

    pub fn position(&self, name: &ComponentName) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(ComponentName, Candidate)> {
        self.entries
    }
}

/// The two nested preference-weight tables driving prompt arbitration: a
/// fixed distribution over prompt types, and per-type distributions over
/// components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PromptPreferences {
    /// Preference weight per prompt type.
    #[serde(default)]
    pub types: BTreeMap<PromptType, f64>,
    /// Preference weight per component, keyed by type then component.
    #[serde(default)]
    pub components: BTreeMap<PromptType, BTreeMap<ComponentName, f64>>,
}

impl PromptPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type_weight(mut self, prompt_type: PromptType, weight: f64) -> Self {
        self.types.insert(prompt_type, weight);
        self
    }

    pub fn with_component_weight(
        mut self,
        prompt_type: PromptType,
        component: impl Into<ComponentName>,
        weight: f64,
    ) -> Self {
        self.components
            .entry(prompt_type)
            .or_default()
            .insert(component.into(), weight);
        self
    }

    pub fn type_weight(&self, prompt_type: PromptType) -> Option<f64> {
        self.types.get(&prompt_type).copied()
    }

    pub fn component_weight(
        &self,
        prompt_type: PromptType,
        component: &ComponentName,
    ) -> Option<f64> {
        self.components
            .get(&prompt_type)
            .and_then(|per_type| per_type.get(component))
            .copied()
    }
}

/// Rank response candidates by (priority desc, tie-break desc).
///
/// The input map must be non-empty and contain at least one
/// universal-fallback candidate; its absence is surfaced as
/// [`ArbitrationError::MissingFallback`] rather than tolerated silently
/// (callers log it and degrade via [`rank_responses_unchecked`]).
pub fn rank_responses(
    candidates: BTreeMap<ComponentName, Candidate>,
    tie_breaks: &BTreeMap<ComponentName, TieBreak>,
    launch: Option<&ComponentName>,
    first_turn: bool,
) -> Result<RankedSet, ArbitrationError> {
    if candidates.is_empty() {
        return Err(ArbitrationError::EmptyCandidateSet);
    }
    let has_fallback = candidates
        .values()
        .any(|c| c.priority() == Some(Priority::UniversalFallback));
    if !has_fallback {
        let offered = candidates
            .keys()
            .map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ArbitrationError::MissingFallback { offered });
    }
    Ok(rank_responses_unchecked(
        candidates, tie_breaks, launch, first_turn,
    ))
}

/// Response ranking without the mandatory-fallback check; the degraded path
/// after that check has been surfaced.
pub fn rank_responses_unchecked(
    candidates: BTreeMap<ComponentName, Candidate>,
    tie_breaks: &BTreeMap<ComponentName, TieBreak>,
    launch: Option<&ComponentName>,
    first_turn: bool,
) -> RankedSet {
    let mut entries: Vec<(Priority, bool, TieBreak, ComponentName, Candidate)> = candidates
        .into_iter()
        .map(|(name, candidate)| {
            if let Err(err) = candidate.validate(&name) {
                debug_assert!(false, "invalid candidate: {err}");
                warn!(component = %name, %err, "ranking an invalid candidate");
            }
            let priority = match candidate.priority() {
                Some(p) => p,
                None => {
                    debug_assert!(false, "prompt candidate in response ranking");
                    warn!(component = %name, "prompt candidate offered as a response");
                    Priority::No
                }
            };
            // The opening line is mandatory: the launch flag is compared
            // ahead of the tie-break, so no configured value can tie it.
            let is_launch = first_turn && launch == Some(&name);
            let tie_break = tie_breaks.get(&name).copied().unwrap_or_default();
            (priority, is_launch, tie_break, name, candidate)
        })
        .collect();

    entries.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then(b.1.cmp(&a.1))
            .then(b.2.cmp(&a.2))
            .then(a.3.cmp(&b.3))
    });

    RankedSet::from_entries(
        entries
            .into_iter()
            .map(|(_, _, _, name, candidate)| (name, candidate))
            .collect(),
    )
}

/// Rank prompt candidates by weighted sampling.
///
/// A forced test override naming a component that offered a real prompt is
/// selected directly. Otherwise a prompt type is sampled from the
/// type-preference distribution over the offered types, then a component is
/// sampled from that type's component-preference distribution (scaled by the
/// recency signal when available). The sampled prompt ranks first, remaining
/// offers follow in random order, `no`-type prompts last.
pub fn rank_prompts<R: Rng>(
    candidates: BTreeMap<ComponentName, Candidate>,
    prefs: &PromptPreferences,
    recency: Option<&BTreeMap<ComponentName, u64>>,
    forced: Option<&ComponentName>,
    rng: &mut R,
) -> Result<RankedSet, ArbitrationError> {
    if candidates.is_empty() {
        return Err(ArbitrationError::EmptyCandidateSet);
    }

    let mut offered: Vec<(ComponentName, Candidate)> = Vec::new();
    let mut declined: Vec<(ComponentName, Candidate)> = Vec::new();
    for (name, candidate) in candidates {
        if let Err(err) = candidate.validate(&name) {
            debug_assert!(false, "invalid candidate: {err}");
            warn!(component = %name, %err, "ranking an invalid prompt candidate");
        }
        if candidate.prompt_type().is_some_and(|t| t.is_offered()) {
            offered.push((name, candidate));
        } else {
            declined.push((name, candidate));
        }
    }

    if offered.is_empty() {
        return Ok(RankedSet::from_entries(declined));
    }

    let selected = match forced {
        Some(forced) if offered.iter().any(|(n, _)| n == forced) => {
            info!(component = %forced, "prompt selection forced by override");
            forced.clone()
        }
        Some(forced) => {
            warn!(component = %forced, "forced prompt component offered no prompt; ignoring override");
            sample_prompt_owner(&offered, prefs, recency, rng)
        }
        None => sample_prompt_owner(&offered, prefs, recency, rng),
    };

    let position = offered
        .iter()
        .position(|(n, _)| *n == selected)
        .unwrap_or_default();
    let top = offered.remove(position);
    offered.shuffle(rng);

    let mut entries = Vec::with_capacity(1 + offered.len() + declined.len());
    entries.push(top);
    entries.extend(offered);
    entries.extend(declined);
    Ok(RankedSet::from_entries(entries))
}

fn sample_prompt_owner<R: Rng>(
    offered: &[(ComponentName, Candidate)],
    prefs: &PromptPreferences,
    recency: Option<&BTreeMap<ComponentName, u64>>,
    rng: &mut R,
) -> ComponentName {
    // Step 1: sample a prompt type from the preference distribution over the
    // offered types only.
    let mut offered_types: Vec<PromptType> = offered
        .iter()
        .filter_map(|(_, c)| c.prompt_type())
        .collect();
    offered_types.sort();
    offered_types.dedup();

    let type_weights: Vec<f64> = offered_types
        .iter()
        .map(|t| {
            let weight = prefs.type_weight(*t).unwrap_or(0.0);
            if weight <= 0.0 {
                warn!(prompt_type = %t, "offered prompt type has no preference weight");
            }
            weight
        })
        .collect();
    let chosen_type = sample_index(&type_weights, rng)
        .map(|i| offered_types[i])
        .unwrap_or_else(|| {
            // every offered type is unweighted; fall back to uniform
            error!("no weighted prompt type among offers; sampling uniformly");
            offered_types[rng.gen_range(0..offered_types.len())]
        });

    // Step 2: sample a component among those offering the chosen type,
    // scaled by recency when available.
    let offering: Vec<&ComponentName> = offered
        .iter()
        .filter(|(_, c)| c.prompt_type() == Some(chosen_type))
        .map(|(n, _)| n)
        .collect();

    let component_weights: Vec<f64> = offering
        .iter()
        .map(|name| {
            let base = match prefs.component_weight(chosen_type, name) {
                Some(w) if w > 0.0 => w,
                _ => {
                    let err = ArbitrationError::MissingPromptWeight {
                        prompt_type: chosen_type.to_string(),
                        component: (*name).clone(),
                    };
                    error!(%err, "excluding component from prompt sampling");
                    return 0.0;
                }
            };
            match recency {
                // +1 keeps a component that spoke last turn samplable and
                // keeps the scaling monotone in the recency value
                Some(recency) => {
                    base * (recency.get(*name).copied().unwrap_or(0) + 1) as f64
                }
                None => base,
            }
        })
        .collect();

    let index = sample_index(&component_weights, rng).unwrap_or_else(|| {
        error!(prompt_type = %chosen_type, "all offering components excluded; sampling uniformly");
        rng.gen_range(0..offering.len())
    });
    let selected = offering[index].clone();
    debug!(prompt_type = %chosen_type, component = %selected, "sampled prompt owner");
    selected
}

fn sample_index<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.iter().all(|w| *w <= 0.0) {
        return None;
    }
    WeightedIndex::new(weights).ok().map(|dist| dist.sample(rng))
}
