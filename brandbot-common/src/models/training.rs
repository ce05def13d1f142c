// File: brandbot-common/src/models/training.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Exclusive right of one run to train a bot, until released or expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingLease {
    pub bot_id: Uuid,
    pub run_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TrainingLease {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Result of trying to take a bot's lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseOutcome {
    Acquired,
    /// Another live run holds it.
    Held { run_id: Uuid },
}
