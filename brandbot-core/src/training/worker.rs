//! src/training/worker.rs
//!
//! Worker loop for the training pipeline. Each worker takes jobs off the shared
//! queue until shutdown, then drains what is left as failed runs.

use std::any::Any;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use brandbot_common::models::Polling;
use crate::repositories::{BotRepository, PollingRepository, TrainingLeaseRepository};
use crate::Error;
use super::{Trainer, TrainingJob, PIPELINE_SHUT_DOWN};

pub(super) struct WorkerContext {
    pub bots: Arc<dyn BotRepository>,
    pub pollings: Arc<dyn PollingRepository>,
    pub leases: Arc<dyn TrainingLeaseRepository>,
    pub trainer: Arc<dyn Trainer>,
    pub queue: Mutex<mpsc::Receiver<TrainingJob>>,
}

pub(super) fn spawn_worker(
    idx: usize,
    ctx: Arc<WorkerContext>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Training worker {} started", idx);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let next = tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                },
                job = async { ctx.queue.lock().await.recv().await } => job,
            };

            match next {
                Some(job) => run_job(&ctx, job).await,
                None => {
                    info!("Training queue closed => worker {} exiting.", idx);
                    break;
                }
            }
        }

        // Jobs still queued already have a started row and a lease; close them out.
        loop {
            let job = ctx.queue.lock().await.try_recv();
            let Ok(job) = job else { break };
            info!("Worker {} aborting queued run={} for bot={}", idx, job.run_id, job.bot.id);
            finish(&ctx, job.bot.id, job.run_id, Err(Error::Training(PIPELINE_SHUT_DOWN.into()))).await;
        }

        info!("Training worker {} exited.", idx);
    })
}

async fn run_job(ctx: &WorkerContext, job: TrainingJob) {
    let TrainingJob { bot, run_id } = job;
    info!("Training run={} for bot={} begins", run_id, bot.id);

    record(ctx, Polling::training(bot.id, run_id)).await;

    let outcome = match ctx.bots.list_knowledge_items(bot.id).await {
        Ok(items) => {
            let trainer = ctx.trainer.clone();
            let bot = bot.clone();
            // Separate task so a panicking trainer becomes a failed run.
            match tokio::spawn(async move { trainer.train(&bot, &items).await }).await {
                Ok(result) => result,
                Err(join_err) if join_err.is_panic() => Err(Error::Training(format!(
                    "Training panicked: {}",
                    panic_message(join_err.into_panic())
                ))),
                Err(join_err) => Err(Error::Training(format!("Training task cancelled: {join_err}"))),
            }
        }
        Err(e) => Err(e),
    };

    finish(ctx, bot.id, run_id, outcome).await;
}

async fn finish(ctx: &WorkerContext, bot_id: Uuid, run_id: Uuid, outcome: Result<(), Error>) {
    let row = match outcome {
        Ok(()) => {
            info!("Training run={} for bot={} is ready", run_id, bot_id);
            Polling::ready(bot_id, run_id)
        }
        Err(e) => {
            error!("Training run={} for bot={} failed: {}", run_id, bot_id, e);
            Polling::failed(bot_id, run_id, &e.detail())
        }
    };
    record(ctx, row).await;

    if let Err(e) = ctx.leases.release(bot_id, run_id).await {
        error!("Failed to release training lease for bot={} run={}: {:?}", bot_id, run_id, e);
    }
}

async fn record(ctx: &WorkerContext, row: Polling) {
    if let Err(e) = ctx.pollings.insert_polling(&row).await {
        error!(
            "Failed to write {} row for bot={} run={}: {:?}",
            row.status, row.bot_id, row.run_id, e
        );
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42_u8)), "unknown panic");
    }
}
