//! src/training/trainer.rs
//!
//! The seam between the worker pool and whatever actually trains a bot.

use std::time::Duration;
use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};
use brandbot_common::models::{Bot, KnowledgeItem};
use crate::Error;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Trainer: Send + Sync {
    /// Train `bot` on `items`. An `Err` is recorded as an error polling row.
    async fn train(&self, bot: &Bot, items: &[KnowledgeItem]) -> Result<(), Error>;
}

/// Stand-in trainer: waits a random delay, then succeeds or fails at random.
#[derive(Debug, Clone)]
pub struct SimulatedTrainer {
    min_delay: Duration,
    max_delay: Duration,
    failure_rate: f64,
}

impl SimulatedTrainer {
    pub fn new(min_delay: Duration, max_delay: Duration, failure_rate: f64) -> Self {
        let (min_delay, max_delay) = if min_delay <= max_delay {
            (min_delay, max_delay)
        } else {
            warn!("Simulated trainer: min_delay > max_delay, swapping them");
            (max_delay, min_delay)
        };
        let failure_rate = if failure_rate.is_finite() {
            failure_rate.clamp(0.0, 1.0)
        } else {
            warn!("Simulated trainer: failure_rate {} is not finite, using 0", failure_rate);
            0.0
        };
        Self {
            min_delay,
            max_delay,
            failure_rate,
        }
    }

    fn roll(&self) -> (Duration, bool) {
        let min_ms = self.min_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let mut rng = rand::rng();
        let delay = Duration::from_millis(rng.random_range(min_ms..=max_ms));
        let fail = rng.random_bool(self.failure_rate);
        (delay, fail)
    }
}

impl Default for SimulatedTrainer {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(5), 0.0)
    }
}

#[async_trait]
impl Trainer for SimulatedTrainer {
    async fn train(&self, bot: &Bot, items: &[KnowledgeItem]) -> Result<(), Error> {
        // ThreadRng is !Send, so roll before the first await.
        let (delay, fail) = self.roll();
        debug!(
            "Simulated training for bot={} items={} delay={:?}",
            bot.id,
            items.len(),
            delay
        );
        tokio::time::sleep(delay).await;

        if fail {
            return Err(Error::Training("Simulated training failure".into()));
        }
        Ok(())
    }
}
