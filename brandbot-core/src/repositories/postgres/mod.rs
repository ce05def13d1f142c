// src/repositories/postgres/mod.rs

pub mod company;
pub mod user;
pub mod bot;
pub mod whitelisted_domain;
pub mod polling;
pub mod training_lease;

pub use company::PostgresCompanyRepository;
pub use user::PostgresUserRepository;
pub use bot::PostgresBotRepository;
pub use whitelisted_domain::PostgresWhitelistedDomainRepository;
pub use polling::PostgresPollingRepository;
pub use training_lease::PostgresTrainingLeaseRepository;
