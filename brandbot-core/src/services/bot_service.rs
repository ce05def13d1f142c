use std::collections::HashSet;
use std::sync::Arc;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;
use brandbot_common::models::{
    Bot, BotAggregate, Company, CreateBot, KnowledgeItem, KnowledgeItemType, Tone,
};
use crate::repositories::{BotRepository, WhitelistedDomainRepository};
use crate::training::{TrainingPipeline, TrainingTrigger};
use crate::Error;

/// Response body for a domain replacement.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DomainsUpdated {
    pub message: String,
    pub domains: Vec<String>,
}

/// Bot registry: provisioning, lookup and whitelisted-domain management,
/// always scoped to a resolved tenant.
pub struct BotService {
    bots: Arc<dyn BotRepository>,
    domains: Arc<dyn WhitelistedDomainRepository>,
    pipeline: Arc<TrainingPipeline>,
}

impl BotService {
    pub fn new(
        bots: Arc<dyn BotRepository>,
        domains: Arc<dyn WhitelistedDomainRepository>,
        pipeline: Arc<TrainingPipeline>,
    ) -> Self {
        Self { bots, domains, pipeline }
    }

    /// Persists the bot with its knowledge items, then kicks off training.
    ///
    /// A failure to start training is logged, not returned: the bot exists and
    /// the first status read will start a run.
    pub async fn create_bot(&self, company: &Company, req: CreateBot) -> Result<BotAggregate, Error> {
        let name = match req.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("{} Bot", company.name),
        };
        let tone = match req.tone.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.parse::<Tone>().map_err(Error::Validation)?,
            _ => Tone::default(),
        };

        let bot = Bot::new(company.id, &name, tone);
        let items = req
            .knowledge_items
            .iter()
            .map(|item| {
                let kind = item.item_type.parse::<KnowledgeItemType>().map_err(Error::Validation)?;
                Ok(KnowledgeItem::new(bot.id, kind, &item.content))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        self.bots.create_bot_with_items(&bot, &items).await?;
        info!(
            "Created bot={} '{}' for company={} with {} knowledge items",
            bot.id,
            bot.name,
            company.id,
            items.len()
        );

        if let Err(e) = self.pipeline.start_training(&bot).await {
            error!("Could not start training for new bot={}: {:?}", bot.id, e);
        }

        Ok(BotAggregate::assemble(&bot, company, items, Vec::new()))
    }

    /// Newest first.
    pub async fn list_bots(&self, company: &Company) -> Result<Vec<BotAggregate>, Error> {
        let bots = self.bots.list_bots_for_company(company.id).await?;
        let mut out = Vec::with_capacity(bots.len());
        for bot in bots {
            out.push(self.aggregate(&bot, company).await?);
        }
        Ok(out)
    }

    pub async fn get_bot(&self, company: &Company, bot_id: Uuid) -> Result<BotAggregate, Error> {
        let bot = self.owned_bot(company, bot_id).await?;
        self.aggregate(&bot, company).await
    }

    /// Replaces the bot's whole domain list. Entries are trimmed; blanks and
    /// repeats are dropped, keeping first-seen order.
    pub async fn replace_whitelisted_domains(
        &self,
        company: &Company,
        bot_id: Uuid,
        domains: &[String],
    ) -> Result<DomainsUpdated, Error> {
        let bot = self.owned_bot(company, bot_id).await?;
        let cleaned = normalize_domains(domains);

        let stored = self.domains.replace_domains(bot.id, &cleaned).await?;
        info!("Replaced whitelisted domains for bot={} ({} entries)", bot.id, stored.len());

        Ok(DomainsUpdated {
            message: "Whitelisted domains updated".to_string(),
            domains: stored.into_iter().map(|d| d.domain).collect(),
        })
    }

    pub async fn retrain_bot(&self, company: &Company, bot_id: Uuid) -> Result<TrainingTrigger, Error> {
        let bot = self.owned_bot(company, bot_id).await?;
        self.pipeline.start_training(&bot).await
    }

    /// Bots of other tenants are reported as missing.
    async fn owned_bot(&self, company: &Company, bot_id: Uuid) -> Result<Bot, Error> {
        match self.bots.get_bot(bot_id).await? {
            Some(bot) if bot.company_id == company.id => Ok(bot),
            _ => Err(Error::NotFound("Bot not found".into())),
        }
    }

    async fn aggregate(&self, bot: &Bot, company: &Company) -> Result<BotAggregate, Error> {
        let items = self.bots.list_knowledge_items(bot.id).await?;
        let domains = self.domains.list_domains(bot.id).await?;
        Ok(BotAggregate::assemble(bot, company, items, domains))
    }
}

fn normalize_domains(domains: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    domains
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .filter(|d| seen.insert(d.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_blanks_and_repeats() {
        let input: Vec<String> = ["a.com", " ", "b.com", "a.com", "  c.com  ", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(normalize_domains(&input), vec!["a.com", "b.com", "c.com"]);
    }

    #[test]
    fn normalize_of_nothing_is_nothing() {
        assert!(normalize_domains(&[]).is_empty());
        assert!(normalize_domains(&["   ".to_string()]).is_empty());
    }
}
