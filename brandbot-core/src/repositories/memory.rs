//! In-process backend implementing every repository trait.
//!
//! Mirrors the Postgres schema rules that callers can observe: cascades on
//! company/bot removal, unique emails, unique `(bot, domain)` pairs, creation
//! ordering, and lease takeover only after expiry. Used by the test suites
//! and by the server's `--memory` mode.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;
use brandbot_common::models::{
    Bot, Company, KnowledgeItem, LeaseOutcome, Polling, TrainingLease, User, WhitelistedDomain,
};
use brandbot_common::traits::repository_traits::{
    BotRepository, CompanyRepository, PollingRepository, TrainingLeaseRepository, UserRepository,
    WhitelistedDomainRepository,
};
use crate::Error;

#[derive(Default)]
struct Tables {
    companies: Vec<Company>,
    users: Vec<User>,
    bots: Vec<Bot>,
    knowledge_items: Vec<KnowledgeItem>,
    pollings: Vec<Polling>,
    domains: Vec<WhitelistedDomain>,
    leases: HashMap<Uuid, TrainingLease>,
}

impl Tables {
    fn has_bot(&self, bot_id: Uuid) -> bool {
        self.bots.iter().any(|b| b.id == bot_id)
    }

    fn cascade_bot(&mut self, bot_id: Uuid) {
        self.knowledge_items.retain(|k| k.bot_id != bot_id);
        self.pollings.retain(|p| p.bot_id != bot_id);
        self.domains.retain(|d| d.bot_id != bot_id);
        self.leases.remove(&bot_id);
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompanyRepository for MemoryStore {
    async fn create_company(&self, company: &Company) -> Result<(), Error> {
        let mut t = self.tables.lock().await;
        if t.companies.iter().any(|c| c.id == company.id) {
            return Err(Error::Conflict(format!("Company {} already exists", company.id)));
        }
        t.companies.push(company.clone());
        Ok(())
    }

    async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>, Error> {
        let t = self.tables.lock().await;
        Ok(t.companies.iter().find(|c| c.id == company_id).cloned())
    }

    async fn first_company(&self) -> Result<Option<Company>, Error> {
        let t = self.tables.lock().await;
        Ok(t.companies.iter().min_by_key(|c| c.created_at).cloned())
    }

    async fn update_company(&self, company: &Company) -> Result<(), Error> {
        let mut t = self.tables.lock().await;
        let Some(existing) = t.companies.iter_mut().find(|c| c.id == company.id) else {
            return Err(Error::NotFound("Company not found".into()));
        };
        *existing = Company {
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..company.clone()
        };
        Ok(())
    }

    async fn delete_company(&self, company_id: Uuid) -> Result<(), Error> {
        let mut t = self.tables.lock().await;
        t.companies.retain(|c| c.id != company_id);
        t.users.retain(|u| u.company_id != Some(company_id));

        let owned: Vec<Uuid> = t
            .bots
            .iter()
            .filter(|b| b.company_id == company_id)
            .map(|b| b.id)
            .collect();
        t.bots.retain(|b| b.company_id != company_id);
        for bot_id in owned {
            t.cascade_bot(bot_id);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), Error> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(Error::Conflict("User with this email already exists".into()));
        }
        if let Some(company_id) = user.company_id {
            if !t.companies.iter().any(|c| c.id == company_id) {
                return Err(Error::NotFound("Company not found".into()));
            }
        }
        t.users.push(user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl BotRepository for MemoryStore {
    async fn create_bot_with_items(&self, bot: &Bot, items: &[KnowledgeItem]) -> Result<(), Error> {
        let mut t = self.tables.lock().await;
        if !t.companies.iter().any(|c| c.id == bot.company_id) {
            return Err(Error::NotFound("Company not found".into()));
        }
        t.bots.push(bot.clone());
        t.knowledge_items.extend(items.iter().cloned());
        Ok(())
    }

    async fn get_bot(&self, bot_id: Uuid) -> Result<Option<Bot>, Error> {
        let t = self.tables.lock().await;
        Ok(t.bots.iter().find(|b| b.id == bot_id).cloned())
    }

    async fn list_bots_for_company(&self, company_id: Uuid) -> Result<Vec<Bot>, Error> {
        let t = self.tables.lock().await;
        let mut bots: Vec<Bot> = t
            .bots
            .iter()
            .filter(|b| b.company_id == company_id)
            .cloned()
            .collect();
        // Reversed first so timestamp ties come out newest-inserted first.
        bots.reverse();
        bots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bots)
    }

    async fn list_knowledge_items(&self, bot_id: Uuid) -> Result<Vec<KnowledgeItem>, Error> {
        let t = self.tables.lock().await;
        Ok(t.knowledge_items.iter().filter(|k| k.bot_id == bot_id).cloned().collect())
    }
}

#[async_trait]
impl WhitelistedDomainRepository for MemoryStore {
    async fn list_domains(&self, bot_id: Uuid) -> Result<Vec<WhitelistedDomain>, Error> {
        let t = self.tables.lock().await;
        Ok(t.domains.iter().filter(|d| d.bot_id == bot_id).cloned().collect())
    }

    async fn replace_domains(&self, bot_id: Uuid, domains: &[String]) -> Result<Vec<WhitelistedDomain>, Error> {
        // Single lock scope => readers never see the empty intermediate state.
        let mut t = self.tables.lock().await;
        if !t.has_bot(bot_id) {
            return Err(Error::NotFound("Bot not found".into()));
        }
        t.domains.retain(|d| d.bot_id != bot_id);

        let mut stored: Vec<WhitelistedDomain> = Vec::with_capacity(domains.len());
        for domain in domains {
            if stored.iter().any(|d| &d.domain == domain) {
                continue;
            }
            stored.push(WhitelistedDomain::new(bot_id, domain));
        }
        t.domains.extend(stored.iter().cloned());
        Ok(stored)
    }
}

#[async_trait]
impl PollingRepository for MemoryStore {
    async fn insert_polling(&self, polling: &Polling) -> Result<(), Error> {
        let mut t = self.tables.lock().await;
        if !t.has_bot(polling.bot_id) {
            return Err(Error::NotFound("Bot not found".into()));
        }
        t.pollings.push(polling.clone());
        Ok(())
    }

    async fn list_pollings(&self, bot_id: Uuid) -> Result<Vec<Polling>, Error> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Polling> = t.pollings.iter().filter(|p| p.bot_id == bot_id).cloned().collect();
        // Stable: equal timestamps keep insertion order.
        rows.sort_by_key(|p| p.created_at);
        Ok(rows)
    }
}

#[async_trait]
impl TrainingLeaseRepository for MemoryStore {
    async fn try_acquire(
        &self,
        bot_id: Uuid,
        run_id: Uuid,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<LeaseOutcome, Error> {
        let mut t = self.tables.lock().await;
        if !t.has_bot(bot_id) {
            return Err(Error::NotFound("Bot not found".into()));
        }
        if let Some(existing) = t.leases.get(&bot_id) {
            if !existing.is_expired(now) {
                return Ok(LeaseOutcome::Held { run_id: existing.run_id });
            }
        }
        t.leases.insert(
            bot_id,
            TrainingLease {
                bot_id,
                run_id,
                acquired_at: now,
                expires_at,
            },
        );
        Ok(LeaseOutcome::Acquired)
    }

    async fn release(&self, bot_id: Uuid, run_id: Uuid) -> Result<(), Error> {
        let mut t = self.tables.lock().await;
        if t.leases.get(&bot_id).is_some_and(|l| l.run_id == run_id) {
            t.leases.remove(&bot_id);
        }
        Ok(())
    }

    async fn get_lease(&self, bot_id: Uuid) -> Result<Option<TrainingLease>, Error> {
        let t = self.tables.lock().await;
        Ok(t.leases.get(&bot_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandbot_common::models::{KnowledgeItemType, Tone};
    use chrono::Duration;

    async fn seeded() -> Result<(MemoryStore, Company, Bot), Error> {
        let store = MemoryStore::new();
        let company = Company::new("Acme");
        store.create_company(&company).await?;
        let bot = Bot::new(company.id, "Acme Bot", Tone::Friendly);
        let item = KnowledgeItem::new(bot.id, KnowledgeItemType::Text, "hello");
        store.create_bot_with_items(&bot, &[item]).await?;
        Ok((store, company, bot))
    }

    #[tokio::test]
    async fn bots_with_equal_timestamps_list_newest_insert_first() -> Result<(), Error> {
        let (store, company, first) = seeded().await?;
        let mut second = Bot::new(company.id, "Second", Tone::Casual);
        second.created_at = first.created_at;
        store.create_bot_with_items(&second, &[]).await?;

        let ids: Vec<Uuid> = store.list_bots_for_company(company.id).await?.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        Ok(())
    }

    #[tokio::test]
    async fn company_delete_cascades_to_bots_and_children() -> Result<(), Error> {
        let (store, company, bot) = seeded().await?;
        store.insert_polling(&Polling::started(bot.id, Uuid::new_v4())).await?;
        store.replace_domains(bot.id, &["a.com".to_string()]).await?;

        store.delete_company(company.id).await?;

        assert!(store.get_bot(bot.id).await?.is_none());
        assert!(store.list_knowledge_items(bot.id).await?.is_empty());
        assert!(store.list_pollings(bot.id).await?.is_empty());
        assert!(store.list_domains(bot.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn bot_requires_existing_company() {
        let store = MemoryStore::new();
        let bot = Bot::new(Uuid::new_v4(), "Orphan", Tone::Casual);
        let err = store.create_bot_with_items(&bot, &[]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn lease_is_exclusive_until_expiry() -> Result<(), Error> {
        let (store, _company, bot) = seeded().await?;
        let now = Utc::now();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let outcome = store.try_acquire(bot.id, first, now, now + Duration::seconds(30)).await?;
        assert_eq!(outcome, LeaseOutcome::Acquired);

        let outcome = store.try_acquire(bot.id, second, now, now + Duration::seconds(30)).await?;
        assert_eq!(outcome, LeaseOutcome::Held { run_id: first });

        // A stale lease can be taken over.
        let later = now + Duration::seconds(31);
        let outcome = store.try_acquire(bot.id, second, later, later + Duration::seconds(30)).await?;
        assert_eq!(outcome, LeaseOutcome::Acquired);

        // Releasing with the old run id is a no-op.
        store.release(bot.id, first).await?;
        assert_eq!(store.get_lease(bot.id).await?.map(|l| l.run_id), Some(second));

        store.release(bot.id, second).await?;
        assert!(store.get_lease(bot.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() -> Result<(), Error> {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            username: "a".into(),
            password_hash: "x".into(),
            first_name: String::new(),
            last_name: String::new(),
            company_id: None,
            profile_picture_url: None,
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user).await?;
        let dup = User { id: Uuid::new_v4(), ..user.clone() };
        assert!(matches!(store.create_user(&dup).await, Err(Error::Conflict(_))));
        Ok(())
    }
}
