//! Port for the machine-readable turn transcript.
//!
//! `tracing` carries the human-readable diagnostics; this port records what
//! arbitration actually decided each turn, as typed data an analysis tool can
//! replay without parsing log lines.

use parley_domain::candidate::Rank;
use parley_domain::core::ComponentName;
use parley_domain::ranking::RankedSet;
use serde::Serialize;

/// One component's position in a ranking, winner first.
#[derive(Debug, Clone, Serialize)]
pub struct RankEntry {
    pub component: ComponentName,
    pub rank: Rank,
}

/// One arbitrated turn, as recorded in the transcript.
#[derive(Debug, Clone, Serialize)]
pub struct TurnEvent {
    pub conversation_id: String,
    pub turn: u64,
    pub utterance: String,
    /// The full outgoing utterance, prompt included.
    pub reply: String,
    pub response_winner: ComponentName,
    pub prompt_winner: Option<ComponentName>,
    pub controller: ComponentName,
    /// Response ranking in selection order.
    pub response_ranking: Vec<RankEntry>,
    /// Prompt ranking, when prompt arbitration ran.
    pub prompt_ranking: Option<Vec<RankEntry>>,
}

impl TurnEvent {
    /// Flatten a ranked set into transcript entries, preserving its order.
    pub fn ranking_entries(ranked: &RankedSet) -> Vec<RankEntry> {
        ranked
            .iter()
            .map(|(name, candidate)| RankEntry {
                component: name.clone(),
                rank: candidate.rank,
            })
            .collect()
    }
}

/// Port for recording the turn transcript.
///
/// `log` is intentionally synchronous and non-fallible so that logging
/// failures never disrupt the turn — implementations swallow their own
/// errors.
pub trait TurnLogger: Send + Sync {
    fn log(&self, event: TurnEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoTurnLogger;

impl TurnLogger for NoTurnLogger {
    fn log(&self, _event: TurnEvent) {}
}
