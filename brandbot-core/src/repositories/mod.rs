// src/repositories/mod.rs

pub mod postgres;
pub mod memory;

pub use brandbot_common::traits::repository_traits::{
    BotRepository,
    CompanyRepository,
    PollingRepository,
    TrainingLeaseRepository,
    UserRepository,
    WhitelistedDomainRepository,
};

pub use postgres::{
    PostgresBotRepository,
    PostgresCompanyRepository,
    PostgresPollingRepository,
    PostgresTrainingLeaseRepository,
    PostgresUserRepository,
    PostgresWhitelistedDomainRepository,
};

pub use memory::MemoryStore;
