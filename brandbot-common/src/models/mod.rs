// File: brandbot-common/src/models/mod.rs
pub mod bot;
pub mod company;
pub mod polling;
pub mod training;
pub mod user;

pub use bot::{Bot, BotAggregate, BotSummary, CreateBot, KnowledgeItem, KnowledgeItemType, NewKnowledgeItem, Tone, WhitelistedDomain};
pub use company::{Company, CompanySummary, CompanyUpdate};
pub use polling::{Polling, PollingStatus, TrainingState};
pub use training::{LeaseOutcome, TrainingLease};
pub use user::{LoginUser, RegisterUser, Session, User, UserProfile};
