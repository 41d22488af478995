//! JSONL transcript writer.
//!
//! Appends one JSON line per arbitrated turn: the typed [`TurnEvent`] record
//! flattened alongside a millisecond UTC timestamp. The file is the replay
//! artifact for tuning prompt distributions offline, so every ranking entry
//! is kept, not just the winners.

use parley_application::ports::turn_logger::{TurnEvent, TurnLogger};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

#[derive(Serialize)]
struct TranscriptLine<'a> {
    timestamp: String,
    #[serde(flatten)]
    turn: &'a TurnEvent,
}

/// Turn transcript logger writing one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`; each turn is flushed as it
/// lands so the transcript survives a crash mid-conversation.
pub struct JsonlTurnLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlTurnLogger {
    /// Create the transcript file (and missing parent directories).
    ///
    /// Returns `None` when the file cannot be created; transcript logging is
    /// optional and must never take the arbiter down with it.
    pub fn create(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && let Err(err) = std::fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), %err, "could not create transcript directory");
            return None;
        }
        match File::create(&path) {
            Ok(file) => Some(Self {
                writer: Mutex::new(BufWriter::new(file)),
                path,
            }),
            Err(err) => {
                warn!(path = %path.display(), %err, "could not create transcript file");
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TurnLogger for JsonlTurnLogger {
    fn log(&self, event: TurnEvent) {
        let line = TranscriptLine {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            turn: &event,
        };
        let Ok(json) = serde_json::to_string(&line) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", json);
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_application::ports::turn_logger::RankEntry;
    use parley_domain::candidate::Rank;
    use parley_domain::core::ComponentName;
    use parley_domain::priority::Priority;

    fn turn(index: u64, winner: &str) -> TurnEvent {
        TurnEvent {
            conversation_id: "c1".into(),
            turn: index,
            utterance: "hello".into(),
            reply: "hi there".into(),
            response_winner: ComponentName::from(winner),
            prompt_winner: None,
            controller: ComponentName::from(winner),
            response_ranking: vec![
                RankEntry {
                    component: ComponentName::from(winner),
                    rank: Rank::Response(Priority::CanStart),
                },
                RankEntry {
                    component: ComponentName::from("fallback"),
                    rank: Rank::Response(Priority::UniversalFallback),
                },
            ],
            prompt_ranking: None,
        }
    }

    #[test]
    fn test_writes_one_turn_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turns.jsonl");
        let logger = JsonlTurnLogger::create(&path).unwrap();

        logger.log(turn(0, "greeter"));
        logger.log(turn(1, "news"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["turn"], 0);
        assert_eq!(first["response_winner"], "greeter");
        assert!(first["timestamp"].is_string());
    }

    #[test]
    fn test_rankings_are_recorded_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turns.jsonl");
        let logger = JsonlTurnLogger::create(&path).unwrap();

        logger.log(turn(0, "greeter"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let record: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        let ranking = record["response_ranking"].as_array().unwrap();
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0]["component"], "greeter");
        assert_eq!(ranking[0]["rank"]["response"], "can_start");
        assert_eq!(ranking[1]["component"], "fallback");
        assert!(record["prompt_ranking"].is_null());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/turns.jsonl");
        let logger = JsonlTurnLogger::create(&path);
        assert!(logger.is_some());
        assert!(path.exists());
    }
}
