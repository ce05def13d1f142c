//! brandbot-server/src/context.rs
//!
//! Builds the server's shared state: storage backend, training pipeline,
//! services and the tenant resolver.

use std::sync::Arc;
use tracing::info;

use brandbot_core::auth::{SessionStore, TenantStrategy};
use brandbot_core::db::Database;
use brandbot_core::repositories::{
    BotRepository, CompanyRepository, MemoryStore, PollingRepository, PostgresBotRepository,
    PostgresCompanyRepository, PostgresPollingRepository, PostgresTrainingLeaseRepository,
    PostgresUserRepository, PostgresWhitelistedDomainRepository, TrainingLeaseRepository,
    UserRepository, WhitelistedDomainRepository,
};
use brandbot_core::services::{AccountService, BotService, CompanyService, StatusService};
use brandbot_core::training::{Trainer, TrainingConfig, TrainingPipeline};
use brandbot_core::Error;

use crate::api::AppState;
use crate::Args;

/// One handle per repository trait, whichever backend sits behind them.
#[derive(Clone)]
pub struct Repositories {
    pub companies: Arc<dyn CompanyRepository>,
    pub users: Arc<dyn UserRepository>,
    pub bots: Arc<dyn BotRepository>,
    pub domains: Arc<dyn WhitelistedDomainRepository>,
    pub pollings: Arc<dyn PollingRepository>,
    pub leases: Arc<dyn TrainingLeaseRepository>,
}

impl Repositories {
    pub fn postgres(db: &Database) -> Self {
        let pool = db.pool().clone();
        Self {
            companies: Arc::new(PostgresCompanyRepository::new(pool.clone())),
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            bots: Arc::new(PostgresBotRepository::new(pool.clone())),
            domains: Arc::new(PostgresWhitelistedDomainRepository::new(pool.clone())),
            pollings: Arc::new(PostgresPollingRepository::new(pool.clone())),
            leases: Arc::new(PostgresTrainingLeaseRepository::new(pool)),
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            companies: store.clone(),
            users: store.clone(),
            bots: store.clone(),
            domains: store.clone(),
            pollings: store.clone(),
            leases: store,
        }
    }
}

/// The global server context.
pub struct ServerContext {
    /// `None` in `--memory` mode.
    pub db: Option<Database>,
    pub pipeline: Arc<TrainingPipeline>,
    pub state: AppState,
}

impl ServerContext {
    /// Connects storage according to `args` and wires everything on top of it.
    pub async fn new(args: &Args) -> Result<Self, Error> {
        let strategy = args.tenant_strategy()?;
        let training = args.training_config()?;
        let trainer: Arc<dyn Trainer> = Arc::new(training.simulated_trainer());

        if args.memory {
            info!("Using in-memory storage; data is lost on exit.");
            return Ok(Self::assemble(
                Repositories::memory(MemoryStore::new()),
                &training,
                trainer,
                strategy,
                None,
            ));
        }

        info!("Using Postgres DB URL: {}", args.database_url);
        let db = Database::new(&args.database_url, args.max_connections).await?;
        db.migrate().await?;

        Ok(Self::assemble(
            Repositories::postgres(&db),
            &training,
            trainer,
            strategy,
            Some(db),
        ))
    }

    pub fn assemble(
        repos: Repositories,
        training: &TrainingConfig,
        trainer: Arc<dyn Trainer>,
        strategy: TenantStrategy,
        db: Option<Database>,
    ) -> Self {
        let pipeline = Arc::new(TrainingPipeline::new(
            training,
            repos.bots.clone(),
            repos.pollings.clone(),
            repos.leases.clone(),
            trainer,
        ));
        let sessions = Arc::new(SessionStore::new());
        let tenants = strategy.build(repos.companies.clone(), repos.users.clone(), sessions.clone());
        info!("Tenant strategy: {}", strategy);

        let state = AppState {
            tenants,
            bots: Arc::new(BotService::new(repos.bots.clone(), repos.domains.clone(), pipeline.clone())),
            status: Arc::new(StatusService::new(
                repos.companies.clone(),
                repos.bots.clone(),
                repos.pollings.clone(),
                pipeline.clone(),
            )),
            companies: Arc::new(CompanyService::new(repos.companies.clone())),
            accounts: Arc::new(AccountService::new(repos.users, repos.companies, sessions)),
        };

        Self { db, pipeline, state }
    }
}
