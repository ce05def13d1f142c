// File: brandbot-core/src/test_utils/helpers.rs

use std::sync::Arc;
use std::time::Duration;
use sqlx::{Pool, Postgres, PgConnection, Connection};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;
use brandbot_common::models::{Company, Polling};
use crate::auth::SessionStore;
use crate::db::Database;
use crate::repositories::{CompanyRepository, MemoryStore, PollingRepository};
use crate::services::{AccountService, BotService, CompanyService, StatusService};
use crate::training::{Trainer, TrainingConfig, TrainingPipeline};
use crate::Error;

/// Training knobs that keep test runs in the millisecond range.
pub fn fast_training_config() -> TrainingConfig {
    TrainingConfig {
        workers: 2,
        queue_capacity: 16,
        min_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        failure_rate: 0.0,
        lease_ttl: Duration::from_secs(60),
    }
}

/// Every service wired over one in-memory store.
pub struct TestStack {
    pub store: MemoryStore,
    pub sessions: Arc<SessionStore>,
    pub pipeline: Arc<TrainingPipeline>,
    pub bots: BotService,
    pub status: StatusService,
    pub companies: CompanyService,
    pub accounts: AccountService,
}

impl TestStack {
    pub fn new(config: &TrainingConfig) -> Self {
        let trainer = Arc::new(config.simulated_trainer());
        Self::with_trainer(config, trainer)
    }

    pub fn with_trainer(config: &TrainingConfig, trainer: Arc<dyn Trainer>) -> Self {
        let store = MemoryStore::new();
        let repo = Arc::new(store.clone());
        let sessions = Arc::new(SessionStore::new());
        let pipeline = Arc::new(TrainingPipeline::new(
            config,
            repo.clone(),
            repo.clone(),
            repo.clone(),
            trainer,
        ));

        Self {
            bots: BotService::new(repo.clone(), repo.clone(), pipeline.clone()),
            status: StatusService::new(repo.clone(), repo.clone(), repo.clone(), pipeline.clone()),
            companies: CompanyService::new(repo.clone()),
            accounts: AccountService::new(repo.clone(), repo, sessions.clone()),
            store,
            sessions,
            pipeline,
        }
    }

    pub async fn seed_company(&self, name: &str) -> Result<Company, Error> {
        let company = Company::new(name);
        self.store.create_company(&company).await?;
        Ok(company)
    }
}

/// Polls the log until a terminal row for `run_id` shows up.
pub async fn wait_for_terminal(
    pollings: &dyn PollingRepository,
    bot_id: Uuid,
    run_id: Uuid,
    timeout: Duration,
) -> Result<Vec<Polling>, Error> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let rows = pollings.list_pollings(bot_id).await?;
        if rows.iter().any(|p| p.run_id == run_id && p.status.is_terminal()) {
            return Ok(rows);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(Error::Training(format!("run {run_id} did not finish within {timeout:?}")));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Create the test database if it does not exist yet.
pub async fn ensure_test_database_exists() -> Result<(), Error> {
    let admin_url = std::env::var("DATABASE_ADMIN_URL")
        .unwrap_or_else(|_| "postgres://brandbot@localhost/postgres".to_string());
    let mut conn = PgConnection::connect(&admin_url).await?;

    let test_db = "brandbot_test";
    let create_db_sql = format!("CREATE DATABASE {test_db};");
    match sqlx::query(&create_db_sql).execute(&mut conn).await {
        Ok(_) => Ok(()),
        // 42P04 => duplicate_database
        Err(e) if e.as_database_error().and_then(|d| d.code()).as_deref() == Some("42P04") => Ok(()),
        Err(e) => Err(Error::Database(e)),
    }
}

/// Pool on `TEST_DATABASE_URL`, else `postgres://brandbot@localhost/brandbot_test`.
pub async fn create_test_db_pool() -> Result<Pool<Postgres>, Error> {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://brandbot@localhost/brandbot_test".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;
    Ok(pool)
}

/// Wipes out test data so each test can start fresh.
pub async fn clean_database(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query(r#"
        TRUNCATE TABLE
            training_leases,
            pollings,
            whitelisted_domains,
            knowledge_items,
            bots,
            users,
            companies
        RESTART IDENTITY CASCADE;
    "#)
        .execute(pool)
        .await?;

    Ok(())
}

/// Returns a migrated, empty test DB handle.
pub async fn setup_test_database() -> Result<Database, Error> {
    ensure_test_database_exists().await?;

    let pool = create_test_db_pool().await?;
    let db = Database::from_pool(pool);
    db.migrate().await?;
    clean_database(db.pool()).await?;

    Ok(db)
}
