// File: brandbot-common/src/models/polling.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PollingStatus {
    Started,
    Training,
    Ready,
    Error,
}

impl PollingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollingStatus::Ready | PollingStatus::Error)
    }
}

impl fmt::Display for PollingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollingStatus::Started => write!(f, "started"),
            PollingStatus::Training => write!(f, "training"),
            PollingStatus::Ready => write!(f, "ready"),
            PollingStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for PollingStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "started" => Ok(PollingStatus::Started),
            "training" => Ok(PollingStatus::Training),
            "ready" => Ok(PollingStatus::Ready),
            "error" => Ok(PollingStatus::Error),
            _ => Err(format!("Unknown polling status: {}", s)),
        }
    }
}

/// One immutable event in a bot's training timeline.
///
/// Rows are only ever appended. The current status of a bot is whatever the
/// most recent row says; see [`TrainingState::from_log`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Polling {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub bot_id: Uuid,
    /// The training run that wrote this row.
    pub run_id: Uuid,
    pub status: PollingStatus,
    pub completed: bool,
    pub error: Option<String>,
    pub success: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Polling {
    fn event(
        bot_id: Uuid,
        run_id: Uuid,
        status: PollingStatus,
        completed: bool,
        error: Option<String>,
        success: Option<bool>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bot_id,
            run_id,
            status,
            completed,
            error,
            success,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn started(bot_id: Uuid, run_id: Uuid) -> Self {
        Self::event(bot_id, run_id, PollingStatus::Started, false, None, None)
    }

    pub fn training(bot_id: Uuid, run_id: Uuid) -> Self {
        Self::event(bot_id, run_id, PollingStatus::Training, false, None, None)
    }

    pub fn ready(bot_id: Uuid, run_id: Uuid) -> Self {
        Self::event(bot_id, run_id, PollingStatus::Ready, true, None, Some(true))
    }

    pub fn failed(bot_id: Uuid, run_id: Uuid, error: &str) -> Self {
        Self::event(
            bot_id,
            run_id,
            PollingStatus::Error,
            true,
            Some(error.to_string()),
            Some(false),
        )
    }
}

/// Current training state, derived from the polling log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrainingState {
    NotStarted,
    Started,
    Training,
    Ready,
    Failed { error: Option<String> },
}

impl TrainingState {
    /// Picks the most recent row by `created_at`; on equal timestamps the
    /// later position in the slice wins.
    pub fn from_log(log: &[Polling]) -> Self {
        let latest = log
            .iter()
            .enumerate()
            .max_by_key(|(idx, p)| (p.created_at, *idx))
            .map(|(_, p)| p);

        match latest {
            None => TrainingState::NotStarted,
            Some(p) => match p.status {
                PollingStatus::Started => TrainingState::Started,
                PollingStatus::Training => TrainingState::Training,
                PollingStatus::Ready => TrainingState::Ready,
                PollingStatus::Error => TrainingState::Failed { error: p.error.clone() },
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainingState::Ready | TrainingState::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(mut p: Polling, offset_ms: i64, base: DateTime<Utc>) -> Polling {
        p.created_at = base + Duration::milliseconds(offset_ms);
        p.updated_at = p.created_at;
        p
    }

    #[test]
    fn empty_log_is_not_started() {
        assert_eq!(TrainingState::from_log(&[]), TrainingState::NotStarted);
    }

    #[test]
    fn follows_a_successful_run() {
        let bot = Uuid::new_v4();
        let run = Uuid::new_v4();
        let base = Utc::now();
        let mut log = vec![at(Polling::started(bot, run), 0, base)];
        assert_eq!(TrainingState::from_log(&log), TrainingState::Started);

        log.push(at(Polling::training(bot, run), 10, base));
        assert_eq!(TrainingState::from_log(&log), TrainingState::Training);

        log.push(at(Polling::ready(bot, run), 20, base));
        let state = TrainingState::from_log(&log);
        assert_eq!(state, TrainingState::Ready);
        assert!(state.is_terminal());
    }

    #[test]
    fn failed_run_carries_error_message() {
        let bot = Uuid::new_v4();
        let run = Uuid::new_v4();
        let base = Utc::now();
        let log = vec![
            at(Polling::started(bot, run), 0, base),
            at(Polling::training(bot, run), 5, base),
            at(Polling::failed(bot, run, "embedding backend unavailable"), 9, base),
        ];
        assert_eq!(
            TrainingState::from_log(&log),
            TrainingState::Failed { error: Some("embedding backend unavailable".into()) }
        );
    }

    #[test]
    fn uses_created_at_not_slice_order() {
        let bot = Uuid::new_v4();
        let run = Uuid::new_v4();
        let base = Utc::now();
        let log = vec![
            at(Polling::training(bot, run), 50, base),
            at(Polling::started(bot, run), 0, base),
        ];
        assert_eq!(TrainingState::from_log(&log), TrainingState::Training);
    }

    #[test]
    fn equal_timestamps_prefer_later_row() {
        let bot = Uuid::new_v4();
        let run = Uuid::new_v4();
        let base = Utc::now();
        let log = vec![
            at(Polling::started(bot, run), 0, base),
            at(Polling::training(bot, run), 0, base),
        ];
        assert_eq!(TrainingState::from_log(&log), TrainingState::Training);
    }

    #[test]
    fn terminal_rows_match_invariants() {
        let bot = Uuid::new_v4();
        let run = Uuid::new_v4();
        let ready = Polling::ready(bot, run);
        assert!(ready.completed && ready.success == Some(true) && ready.error.is_none());
        let failed = Polling::failed(bot, run, "boom");
        assert!(failed.completed && failed.success == Some(false));
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(failed.status.is_terminal());
        assert!(!PollingStatus::Training.is_terminal());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            PollingStatus::Started,
            PollingStatus::Training,
            PollingStatus::Ready,
            PollingStatus::Error,
        ] {
            assert_eq!(status.to_string().parse::<PollingStatus>().unwrap(), status);
        }
    }
}
