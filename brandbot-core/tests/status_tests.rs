// File: brandbot-core/tests/status_tests.rs

use std::time::Duration;
use futures_util::future::join_all;
use brandbot_core::models::{Bot, PollingStatus, Tone, TrainingState};
use brandbot_core::repositories::{BotRepository, PollingRepository};
use brandbot_core::test_utils::helpers::*;
use brandbot_core::Error;
use uuid::Uuid;

#[tokio::test]
async fn status_of_untrained_bot_starts_exactly_one_run() -> Result<(), Error> {
    let stack = TestStack::new(&fast_training_config());
    let acme = stack.seed_company("Acme").await?;
    // Inserted directly, so no run was ever started.
    let bot = Bot::new(acme.id, "Orphan", Tone::Casual);
    stack.store.create_bot_with_items(&bot, &[]).await?;

    let status = stack.status.get_status(bot.id).await?;
    assert!(status.pollings.is_empty());
    assert_eq!(status.state, TrainingState::NotStarted);
    assert_eq!(status.bot.id, bot.id);
    assert_eq!(status.bot.company.name, "Acme");

    let rows = stack.store.list_pollings(bot.id).await?;
    assert_eq!(rows.iter().filter(|p| p.status == PollingStatus::Started).count(), 1);
    assert_eq!(rows[0].status, PollingStatus::Started);

    let rows = wait_for_terminal(&stack.store, bot.id, rows[0].run_id, Duration::from_secs(5)).await?;
    let status = stack.status.get_status(bot.id).await?;
    assert_eq!(status.pollings, rows);
    assert_eq!(status.state, TrainingState::Ready);

    stack.pipeline.shutdown_and_wait().await;
    Ok(())
}

#[tokio::test]
async fn concurrent_reads_start_at_most_one_run() -> Result<(), Error> {
    let stack = TestStack::new(&fast_training_config());
    let acme = stack.seed_company("Acme").await?;
    let bot = Bot::new(acme.id, "Orphan", Tone::Casual);
    stack.store.create_bot_with_items(&bot, &[]).await?;

    let reads = (0..8).map(|_| stack.status.get_status(bot.id));
    for res in join_all(reads).await {
        res?;
    }

    let started = stack
        .store
        .list_pollings(bot.id)
        .await?
        .iter()
        .filter(|p| p.status == PollingStatus::Started)
        .count();
    assert_eq!(started, 1);

    stack.pipeline.shutdown_and_wait().await;
    Ok(())
}

#[tokio::test]
async fn status_of_unknown_bot_is_not_found() -> Result<(), Error> {
    let stack = TestStack::new(&fast_training_config());
    stack.seed_company("Acme").await?;

    assert!(matches!(stack.status.get_status(Uuid::new_v4()).await, Err(Error::NotFound(_))));

    stack.pipeline.shutdown_and_wait().await;
    Ok(())
}

#[tokio::test]
async fn status_is_readable_for_any_company_bot() -> Result<(), Error> {
    let stack = TestStack::new(&fast_training_config());
    stack.seed_company("Acme").await?;
    let globex = stack.seed_company("Globex").await?;
    let bot = Bot::new(globex.id, "Theirs", Tone::Technical);
    stack.store.create_bot_with_items(&bot, &[]).await?;

    let status = stack.status.get_status(bot.id).await?;
    assert_eq!(status.bot.company.name, "Globex");
    let rows = stack.store.list_pollings(bot.id).await?;
    assert_eq!(rows[0].status, PollingStatus::Started);

    stack.pipeline.shutdown_and_wait().await;
    Ok(())
}
