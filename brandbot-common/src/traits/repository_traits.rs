use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::error::Error;
use crate::models::{
    Bot, Company, KnowledgeItem, LeaseOutcome, Polling, TrainingLease, User, WhitelistedDomain,
};

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn create_company(&self, company: &Company) -> Result<(), Error>;
    async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>, Error>;
    /// The oldest company, if any.
    async fn first_company(&self) -> Result<Option<Company>, Error>;
    async fn update_company(&self, company: &Company) -> Result<(), Error>;
    /// Cascades to the company's bots and users.
    async fn delete_company(&self, company_id: Uuid) -> Result<(), Error>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<(), Error>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
}

#[async_trait]
pub trait BotRepository: Send + Sync {
    /// Inserts the bot and its knowledge items as one unit.
    async fn create_bot_with_items(&self, bot: &Bot, items: &[KnowledgeItem]) -> Result<(), Error>;
    async fn get_bot(&self, bot_id: Uuid) -> Result<Option<Bot>, Error>;
    /// Newest first.
    async fn list_bots_for_company(&self, company_id: Uuid) -> Result<Vec<Bot>, Error>;
    /// In insertion order.
    async fn list_knowledge_items(&self, bot_id: Uuid) -> Result<Vec<KnowledgeItem>, Error>;
}

#[async_trait]
pub trait WhitelistedDomainRepository: Send + Sync {
    async fn list_domains(&self, bot_id: Uuid) -> Result<Vec<WhitelistedDomain>, Error>;

    /// Deletes every domain row of the bot and inserts `domains` in one
    /// transaction. Callers pass an already de-duplicated list.
    async fn replace_domains(&self, bot_id: Uuid, domains: &[String]) -> Result<Vec<WhitelistedDomain>, Error>;
}

#[async_trait]
pub trait PollingRepository: Send + Sync {
    async fn insert_polling(&self, polling: &Polling) -> Result<(), Error>;
    /// Ordered by creation time, oldest first.
    async fn list_pollings(&self, bot_id: Uuid) -> Result<Vec<Polling>, Error>;
}

#[async_trait]
pub trait TrainingLeaseRepository: Send + Sync {
    /// Takes the bot's lease for `run_id` unless a lease that is still valid
    /// at `now` belongs to someone else.
    async fn try_acquire(
        &self,
        bot_id: Uuid,
        run_id: Uuid,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<LeaseOutcome, Error>;

    /// Drops the lease only if `run_id` still owns it.
    async fn release(&self, bot_id: Uuid, run_id: Uuid) -> Result<(), Error>;

    async fn get_lease(&self, bot_id: Uuid) -> Result<Option<TrainingLease>, Error>;
}
