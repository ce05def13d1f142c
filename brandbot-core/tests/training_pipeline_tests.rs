// File: brandbot-core/tests/training_pipeline_tests.rs

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use brandbot_core::models::{Bot, Company, KnowledgeItem, PollingStatus, Tone, TrainingState};
use brandbot_core::repositories::{
    BotRepository, CompanyRepository, PollingRepository, TrainingLeaseRepository,
};
use brandbot_core::test_utils::helpers::*;
use brandbot_core::training::{
    Trainer, TrainingConfig, TrainingTrigger, PIPELINE_SHUT_DOWN, QUEUE_FULL,
};
use brandbot_core::Error;

/// Blocks every run until the test hands out a permit.
struct GatedTrainer {
    started: mpsc::UnboundedSender<Uuid>,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl Trainer for GatedTrainer {
    async fn train(&self, bot: &Bot, _items: &[KnowledgeItem]) -> Result<(), Error> {
        let _ = self.started.send(bot.id);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| Error::Training(e.to_string()))?;
        permit.forget();
        Ok(())
    }
}

struct PanickingTrainer;

#[async_trait]
impl Trainer for PanickingTrainer {
    async fn train(&self, _bot: &Bot, _items: &[KnowledgeItem]) -> Result<(), Error> {
        panic!("boom");
    }
}

fn gated() -> (Arc<GatedTrainer>, mpsc::UnboundedReceiver<Uuid>, Arc<Semaphore>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let gate = Arc::new(Semaphore::new(0));
    let trainer = Arc::new(GatedTrainer { started: tx, gate: gate.clone() });
    (trainer, rx, gate)
}

async fn new_bot(stack: &TestStack, company: &Company, name: &str) -> Result<Bot, Error> {
    let bot = Bot::new(company.id, name, Tone::Professional);
    stack.store.create_bot_with_items(&bot, &[]).await?;
    Ok(bot)
}

#[tokio::test]
async fn started_row_is_written_before_trigger_returns() -> Result<(), Error> {
    let stack = TestStack::new(&fast_training_config());
    let company = stack.seed_company("Acme").await?;
    let bot = new_bot(&stack, &company, "Acme Bot").await?;

    let trigger = stack.pipeline.start_training(&bot).await?;
    let TrainingTrigger::Queued { run_id } = trigger else {
        panic!("expected a queued run, got {trigger:?}");
    };

    let rows = stack.store.list_pollings(bot.id).await?;
    let first = rows.first().expect("started row must exist");
    assert_eq!(first.status, PollingStatus::Started);
    assert_eq!(first.run_id, run_id);
    assert!(!first.completed);
    assert_eq!(first.error, None);
    assert_eq!(first.success, None);

    let rows = wait_for_terminal(&stack.store, bot.id, run_id, Duration::from_secs(5)).await?;
    let statuses: Vec<PollingStatus> = rows.iter().map(|p| p.status).collect();
    assert_eq!(
        statuses,
        vec![PollingStatus::Started, PollingStatus::Training, PollingStatus::Ready]
    );
    let last = rows.last().unwrap();
    assert!(last.completed);
    assert_eq!(last.success, Some(true));
    assert_eq!(TrainingState::from_log(&rows), TrainingState::Ready);

    assert!(stack.store.get_lease(bot.id).await?.is_none());
    stack.pipeline.shutdown_and_wait().await;
    Ok(())
}

#[tokio::test]
async fn always_failing_trainer_records_exactly_one_error_row() -> Result<(), Error> {
    let config = TrainingConfig { failure_rate: 1.0, ..fast_training_config() };
    let stack = TestStack::new(&config);
    let company = stack.seed_company("Acme").await?;
    let bot = new_bot(&stack, &company, "Acme Bot").await?;

    let run_id = stack.pipeline.start_training(&bot).await?.run_id();
    let rows = wait_for_terminal(&stack.store, bot.id, run_id, Duration::from_secs(5)).await?;

    let errors: Vec<_> = rows.iter().filter(|p| p.status == PollingStatus::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error.as_deref(), Some("Simulated training failure"));
    assert_eq!(errors[0].success, Some(false));
    assert!(errors[0].completed);
    assert!(!rows.iter().any(|p| p.status == PollingStatus::Ready));

    assert!(matches!(TrainingState::from_log(&rows), TrainingState::Failed { .. }));
    stack.pipeline.shutdown_and_wait().await;
    Ok(())
}

#[tokio::test]
async fn trainer_panic_becomes_error_row() -> Result<(), Error> {
    let stack = TestStack::with_trainer(&fast_training_config(), Arc::new(PanickingTrainer));
    let company = stack.seed_company("Acme").await?;
    let bot = new_bot(&stack, &company, "Acme Bot").await?;

    let run_id = stack.pipeline.start_training(&bot).await?.run_id();
    let rows = wait_for_terminal(&stack.store, bot.id, run_id, Duration::from_secs(5)).await?;
    let last = rows.last().unwrap();
    assert_eq!(last.status, PollingStatus::Error);
    assert_eq!(last.error.as_deref(), Some("Training panicked: boom"));

    // The worker survived the panic and still serves new runs.
    let run_id = stack.pipeline.start_training(&bot).await?.run_id();
    wait_for_terminal(&stack.store, bot.id, run_id, Duration::from_secs(5)).await?;
    stack.pipeline.shutdown_and_wait().await;
    Ok(())
}

#[tokio::test]
async fn concurrent_trigger_is_coalesced_into_active_run() -> Result<(), Error> {
    let (trainer, mut started, gate) = gated();
    let stack = TestStack::with_trainer(&fast_training_config(), trainer);
    let company = stack.seed_company("Acme").await?;
    let bot = new_bot(&stack, &company, "Acme Bot").await?;

    let first = stack.pipeline.start_training(&bot).await?;
    started.recv().await;
    let rows_before = stack.store.list_pollings(bot.id).await?.len();

    let second = stack.pipeline.start_training(&bot).await?;
    assert_eq!(second, TrainingTrigger::AlreadyRunning { run_id: first.run_id() });
    assert_eq!(stack.store.list_pollings(bot.id).await?.len(), rows_before);

    gate.add_permits(1);
    wait_for_terminal(&stack.store, bot.id, first.run_id(), Duration::from_secs(5)).await?;

    // Once the run finished, a new trigger starts a fresh run.
    let third = stack.pipeline.start_training(&bot).await?;
    assert!(matches!(third, TrainingTrigger::Queued { .. }));
    assert_ne!(third.run_id(), first.run_id());
    gate.add_permits(1);
    wait_for_terminal(&stack.store, bot.id, third.run_id(), Duration::from_secs(5)).await?;

    stack.pipeline.shutdown_and_wait().await;
    Ok(())
}

#[tokio::test]
async fn full_queue_rejects_with_terminal_row_and_frees_lease() -> Result<(), Error> {
    let (trainer, mut started, gate) = gated();
    let config = TrainingConfig { workers: 1, queue_capacity: 1, ..fast_training_config() };
    let stack = TestStack::with_trainer(&config, trainer);
    let company = stack.seed_company("Acme").await?;
    let a = new_bot(&stack, &company, "A").await?;
    let b = new_bot(&stack, &company, "B").await?;
    let c = new_bot(&stack, &company, "C").await?;

    let run_a = stack.pipeline.start_training(&a).await?;
    started.recv().await;
    let run_b = stack.pipeline.start_training(&b).await?;
    assert!(matches!(run_b, TrainingTrigger::Queued { .. }));

    let run_c = stack.pipeline.start_training(&c).await?;
    match &run_c {
        TrainingTrigger::Rejected { reason, .. } => assert_eq!(reason, QUEUE_FULL),
        other => panic!("expected rejection, got {other:?}"),
    }
    let rows = stack.store.list_pollings(c.id).await?;
    let statuses: Vec<PollingStatus> = rows.iter().map(|p| p.status).collect();
    assert_eq!(statuses, vec![PollingStatus::Started, PollingStatus::Error]);
    assert_eq!(rows[1].error.as_deref(), Some(QUEUE_FULL));
    assert!(stack.store.get_lease(c.id).await?.is_none());

    gate.add_permits(2);
    wait_for_terminal(&stack.store, a.id, run_a.run_id(), Duration::from_secs(5)).await?;
    wait_for_terminal(&stack.store, b.id, run_b.run_id(), Duration::from_secs(5)).await?;
    stack.pipeline.shutdown_and_wait().await;
    Ok(())
}

#[tokio::test]
async fn shutdown_closes_out_queued_runs() -> Result<(), Error> {
    let (trainer, mut started, gate) = gated();
    let config = TrainingConfig { workers: 1, queue_capacity: 4, ..fast_training_config() };
    let stack = TestStack::with_trainer(&config, trainer);
    let company = stack.seed_company("Acme").await?;
    let a = new_bot(&stack, &company, "A").await?;
    let b = new_bot(&stack, &company, "B").await?;

    stack.pipeline.start_training(&a).await?;
    started.recv().await;
    let queued = stack.pipeline.start_training(&b).await?;

    stack.pipeline.shutdown();
    gate.add_permits(1);
    stack.pipeline.shutdown_and_wait().await;

    let a_rows = stack.store.list_pollings(a.id).await?;
    assert_eq!(a_rows.last().map(|p| p.status), Some(PollingStatus::Ready));

    let b_rows = stack.store.list_pollings(b.id).await?;
    let last = b_rows.last().unwrap();
    assert_eq!(last.run_id, queued.run_id());
    assert_eq!(last.status, PollingStatus::Error);
    assert_eq!(last.error.as_deref(), Some(PIPELINE_SHUT_DOWN));
    assert!(stack.store.get_lease(b.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn deleting_company_mid_run_does_not_kill_worker() -> Result<(), Error> {
    let (trainer, mut started, gate) = gated();
    let stack = TestStack::with_trainer(&fast_training_config(), trainer);
    let doomed = stack.seed_company("Doomed").await?;
    let kept = stack.seed_company("Kept").await?;
    let gone = new_bot(&stack, &doomed, "Gone").await?;
    let stays = new_bot(&stack, &kept, "Stays").await?;

    stack.pipeline.start_training(&gone).await?;
    started.recv().await;
    stack.store.delete_company(doomed.id).await?;
    gate.add_permits(1);

    let run_id = stack.pipeline.start_training(&stays).await?.run_id();
    started.recv().await;
    gate.add_permits(1);
    wait_for_terminal(&stack.store, stays.id, run_id, Duration::from_secs(5)).await?;

    assert!(stack.store.list_pollings(gone.id).await?.is_empty());
    stack.pipeline.shutdown_and_wait().await;
    Ok(())
}
