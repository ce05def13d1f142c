// File: src/services/mod.rs

pub mod bot_service;
pub mod status_service;
pub mod company_service;
pub mod account_service;

pub use bot_service::{BotService, DomainsUpdated};
pub use status_service::{BotStatus, StatusService};
pub use company_service::CompanyService;
pub use account_service::{AccountService, AuthenticatedUser};
