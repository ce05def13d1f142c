//! src/training/mod.rs
//!
//! Asynchronous training pipeline. A trigger claims the bot's lease, writes a
//! `started` row and hands the job to a bounded queue; a fixed pool of workers
//! drains the queue and appends `training` and a terminal row per run.

pub mod trainer;
mod worker;

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use brandbot_common::models::{Bot, LeaseOutcome, Polling};
use crate::repositories::{BotRepository, PollingRepository, TrainingLeaseRepository};
use crate::Error;

pub use trainer::{SimulatedTrainer, Trainer};

pub const QUEUE_FULL: &str = "training queue is full";
pub const PIPELINE_SHUT_DOWN: &str = "training pipeline is shut down";

/// Upper bound on the lease ttl; longer values are clamped.
pub const MAX_LEASE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub failure_rate: f64,
    /// How long a run may hold its bot's lease before another trigger can take over.
    pub lease_ttl: Duration,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
            min_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(5),
            failure_rate: 0.0,
            lease_ttl: Duration::from_secs(300),
        }
    }
}

impl TrainingConfig {
    pub fn simulated_trainer(&self) -> SimulatedTrainer {
        SimulatedTrainer::new(self.min_delay, self.max_delay, self.failure_rate)
    }
}

#[derive(Debug, Clone)]
pub struct TrainingJob {
    pub bot: Bot,
    pub run_id: Uuid,
}

/// What a call to [`TrainingPipeline::start_training`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrainingTrigger {
    Queued { run_id: Uuid },
    /// Another run holds the lease; nothing was written.
    AlreadyRunning { run_id: Uuid },
    /// The run was recorded as failed immediately.
    Rejected { run_id: Uuid, reason: String },
}

impl TrainingTrigger {
    pub fn run_id(&self) -> Uuid {
        match self {
            TrainingTrigger::Queued { run_id }
            | TrainingTrigger::AlreadyRunning { run_id }
            | TrainingTrigger::Rejected { run_id, .. } => *run_id,
        }
    }
}

pub struct TrainingPipeline {
    pollings: Arc<dyn PollingRepository>,
    leases: Arc<dyn TrainingLeaseRepository>,
    queue_tx: mpsc::Sender<TrainingJob>,
    shutdown_tx: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    lease_ttl: chrono::Duration,
}

impl TrainingPipeline {
    /// Builds the pipeline and spawns its workers. Must be called inside a Tokio runtime.
    pub fn new(
        config: &TrainingConfig,
        bots: Arc<dyn BotRepository>,
        pollings: Arc<dyn PollingRepository>,
        leases: Arc<dyn TrainingLeaseRepository>,
        trainer: Arc<dyn Trainer>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ctx = Arc::new(worker::WorkerContext {
            bots,
            pollings: pollings.clone(),
            leases: leases.clone(),
            trainer,
            queue: Mutex::new(queue_rx),
        });

        let worker_count = config.workers.max(1);
        let handles = (0..worker_count)
            .map(|idx| worker::spawn_worker(idx, ctx.clone(), shutdown_rx.clone()))
            .collect();

        info!(
            "Training pipeline started with workers={} queue_capacity={}",
            worker_count, config.queue_capacity
        );

        if config.lease_ttl > MAX_LEASE_TTL {
            warn!(
                "Training lease ttl {:?} exceeds {:?}, clamping",
                config.lease_ttl, MAX_LEASE_TTL
            );
        }
        let lease_ttl = chrono::Duration::from_std(config.lease_ttl.min(MAX_LEASE_TTL))
            .unwrap_or_else(|_| chrono::Duration::seconds(300));

        Self {
            pollings,
            leases,
            queue_tx,
            shutdown_tx,
            workers: Mutex::new(handles),
            lease_ttl,
        }
    }

    /// Starts a training run for `bot` unless one is already active.
    ///
    /// Returns once the `started` row is persisted and the job is queued; never
    /// waits for training itself.
    pub async fn start_training(&self, bot: &Bot) -> Result<TrainingTrigger, Error> {
        let run_id = Uuid::new_v4();
        let now = Utc::now();

        let expires_at = now
            .checked_add_signed(self.lease_ttl)
            .ok_or_else(|| Error::Config("training lease expiry out of range".into()))?;

        match self.leases.try_acquire(bot.id, run_id, now, expires_at).await? {
            LeaseOutcome::Acquired => {}
            LeaseOutcome::Held { run_id: active } => {
                info!("Training for bot={} already running as run={}", bot.id, active);
                return Ok(TrainingTrigger::AlreadyRunning { run_id: active });
            }
        }

        if let Err(e) = self.pollings.insert_polling(&Polling::started(bot.id, run_id)).await {
            self.release_quietly(bot.id, run_id).await;
            return Err(e);
        }

        if self.is_shutdown() {
            return self.reject(bot.id, run_id, PIPELINE_SHUT_DOWN).await;
        }

        let job = TrainingJob { bot: bot.clone(), run_id };
        match self.queue_tx.try_send(job) {
            Ok(()) => {
                info!("Queued training run={} for bot={}", run_id, bot.id);
                Ok(TrainingTrigger::Queued { run_id })
            }
            Err(mpsc::error::TrySendError::Full(_)) => self.reject(bot.id, run_id, QUEUE_FULL).await,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.reject(bot.id, run_id, PIPELINE_SHUT_DOWN).await
            }
        }
    }

    async fn reject(&self, bot_id: Uuid, run_id: Uuid, reason: &str) -> Result<TrainingTrigger, Error> {
        warn!("Rejecting training run={} for bot={}: {}", run_id, bot_id, reason);
        let row = Polling::failed(bot_id, run_id, reason);
        let recorded = self.pollings.insert_polling(&row).await;
        self.release_quietly(bot_id, run_id).await;
        recorded?;
        Ok(TrainingTrigger::Rejected {
            run_id,
            reason: reason.to_string(),
        })
    }

    async fn release_quietly(&self, bot_id: Uuid, run_id: Uuid) {
        if let Err(e) = self.leases.release(bot_id, run_id).await {
            error!("Failed to release training lease for bot={} run={}: {:?}", bot_id, run_id, e);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Tells workers to stop after their current job.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Signals shutdown and waits for every worker to exit.
    pub async fn shutdown_and_wait(&self) {
        self.shutdown();
        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.workers.lock().await;
            guard.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Training worker ended abnormally: {:?}", e);
            }
        }
        info!("Training pipeline stopped.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::trainer::MockTrainer;
    use crate::repositories::{CompanyRepository, MemoryStore};
    use brandbot_common::models::{Company, PollingStatus, Tone};

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            workers: 2,
            queue_capacity: 8,
            min_delay: Duration::ZERO,
            max_delay: Duration::from_millis(5),
            failure_rate: 0.0,
            lease_ttl: Duration::from_secs(60),
        }
    }

    async fn seeded_bot(store: &MemoryStore) -> Result<Bot, Error> {
        let company = Company::new("Acme");
        store.create_company(&company).await?;
        let bot = Bot::new(company.id, "Acme Bot", Tone::Friendly);
        store.create_bot_with_items(&bot, &[]).await?;
        Ok(bot)
    }

    fn pipeline_with(store: &MemoryStore, trainer: Arc<dyn Trainer>) -> TrainingPipeline {
        let store = Arc::new(store.clone());
        TrainingPipeline::new(&quick_config(), store.clone(), store.clone(), store, trainer)
    }

    async fn wait_for_terminal(store: &MemoryStore, bot_id: Uuid) -> Result<Vec<Polling>, Error> {
        for _ in 0..200 {
            let rows = store.list_pollings(bot_id).await?;
            if rows.iter().any(|p| p.status.is_terminal()) {
                return Ok(rows);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Err(Error::Training("run never reached a terminal row".into()))
    }

    #[tokio::test]
    async fn mocked_failure_is_recorded_with_message() -> Result<(), Error> {
        let store = MemoryStore::new();
        let bot = seeded_bot(&store).await?;

        let mut trainer = MockTrainer::new();
        trainer
            .expect_train()
            .times(1)
            .returning(|_, _| Err(Error::Training("vector store offline".into())));
        let pipeline = pipeline_with(&store, Arc::new(trainer));

        let trigger = pipeline.start_training(&bot).await?;
        assert!(matches!(trigger, TrainingTrigger::Queued { .. }));

        let rows = wait_for_terminal(&store, bot.id).await?;
        let statuses: Vec<PollingStatus> = rows.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![PollingStatus::Started, PollingStatus::Training, PollingStatus::Error]
        );
        let last = rows.last().unwrap();
        assert_eq!(last.error.as_deref(), Some("vector store offline"));
        assert_eq!(last.success, Some(false));
        assert!(last.completed);
        assert!(rows.iter().all(|p| p.run_id == trigger.run_id()));

        pipeline.shutdown_and_wait().await;
        Ok(())
    }

    #[tokio::test]
    async fn second_trigger_is_coalesced_while_lease_is_held() -> Result<(), Error> {
        let store = MemoryStore::new();
        let bot = seeded_bot(&store).await?;

        let trainer = SimulatedTrainer::new(Duration::from_millis(200), Duration::from_millis(200), 0.0);
        let pipeline = pipeline_with(&store, Arc::new(trainer));

        let first = pipeline.start_training(&bot).await?;
        let second = pipeline.start_training(&bot).await?;
        assert_eq!(second, TrainingTrigger::AlreadyRunning { run_id: first.run_id() });

        let rows = wait_for_terminal(&store, bot.id).await?;
        assert_eq!(
            rows.iter().filter(|p| p.status == PollingStatus::Started).count(),
            1
        );
        pipeline.shutdown_and_wait().await;
        Ok(())
    }

    #[tokio::test]
    async fn triggers_after_shutdown_are_rejected() -> Result<(), Error> {
        let store = MemoryStore::new();
        let bot = seeded_bot(&store).await?;
        let pipeline = pipeline_with(&store, Arc::new(MockTrainer::new()));
        pipeline.shutdown_and_wait().await;

        let trigger = pipeline.start_training(&bot).await?;
        assert!(matches!(
            trigger,
            TrainingTrigger::Rejected { ref reason, .. } if reason == PIPELINE_SHUT_DOWN
        ));
        assert!(store.get_lease(bot.id).await?.is_none());

        let rows = store.list_pollings(bot.id).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].error.as_deref(), Some(PIPELINE_SHUT_DOWN));
        Ok(())
    }

    #[tokio::test]
    async fn oversized_lease_ttl_is_clamped() -> Result<(), Error> {
        let store = MemoryStore::new();
        let bot = seeded_bot(&store).await?;
        let config = TrainingConfig {
            lease_ttl: Duration::from_secs(1_000_000_000_000_000),
            ..quick_config()
        };
        let trainer = SimulatedTrainer::new(Duration::from_millis(200), Duration::from_millis(200), 0.0);
        let shared = Arc::new(store.clone());
        let pipeline =
            TrainingPipeline::new(&config, shared.clone(), shared.clone(), shared, Arc::new(trainer));

        let before = Utc::now();
        let trigger = pipeline.start_training(&bot).await?;
        assert!(matches!(trigger, TrainingTrigger::Queued { .. }));
        let lease = store.get_lease(bot.id).await?.unwrap();
        let limit = chrono::Duration::from_std(MAX_LEASE_TTL).unwrap() + chrono::Duration::seconds(5);
        assert!(lease.expires_at <= before + limit);

        wait_for_terminal(&store, bot.id).await?;
        pipeline.shutdown_and_wait().await;
        Ok(())
    }

    #[test]
    fn trigger_serializes_with_outcome_tag() {
        let run_id = Uuid::nil();
        let json = serde_json::to_value(TrainingTrigger::Queued { run_id }).unwrap();
        assert_eq!(json["outcome"], "queued");
        assert_eq!(json["run_id"], run_id.to_string());
    }
}
