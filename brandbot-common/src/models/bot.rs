// File: brandbot-common/src/models/bot.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::company::{Company, CompanySummary};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Casual,
    Technical,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tone::Professional => write!(f, "professional"),
            Tone::Friendly => write!(f, "friendly"),
            Tone::Casual => write!(f, "casual"),
            Tone::Technical => write!(f, "technical"),
        }
    }
}

impl FromStr for Tone {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "friendly" => Ok(Tone::Friendly),
            "casual" => Ok(Tone::Casual),
            "technical" => Ok(Tone::Technical),
            _ => Err(format!("Unknown tone: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeItemType {
    Url,
    File,
    Text,
}

impl fmt::Display for KnowledgeItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeItemType::Url => write!(f, "url"),
            KnowledgeItemType::File => write!(f, "file"),
            KnowledgeItemType::Text => write!(f, "text"),
        }
    }
}

impl FromStr for KnowledgeItemType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "url" => Ok(KnowledgeItemType::Url),
            "file" => Ok(KnowledgeItemType::File),
            "text" => Ok(KnowledgeItemType::Text),
            _ => Err(format!("Unknown knowledge item type: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Bot {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub tone: Tone,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bot {
    pub fn new(company_id: Uuid, name: &str, tone: Tone) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company_id,
            name: name.to_string(),
            tone,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KnowledgeItem {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub bot_id: Uuid,
    #[serde(rename = "type")]
    pub item_type: KnowledgeItemType,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeItem {
    pub fn new(bot_id: Uuid, item_type: KnowledgeItemType, content: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bot_id,
            item_type,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Knowledge item as submitted by a client; `type` is checked on ingest.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewKnowledgeItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CreateBot {
    pub name: Option<String>,
    pub tone: Option<String>,
    #[serde(default)]
    pub knowledge_items: Vec<NewKnowledgeItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WhitelistedDomain {
    pub id: Uuid,
    pub bot_id: Uuid,
    pub domain: String,
    pub created_at: DateTime<Utc>,
}

impl WhitelistedDomain {
    pub fn new(bot_id: Uuid, domain: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            bot_id,
            domain: domain.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Bot plus everything it owns, as returned by the registry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BotAggregate {
    pub id: Uuid,
    pub name: String,
    pub tone: Tone,
    pub company: CompanySummary,
    pub knowledge_items: Vec<KnowledgeItem>,
    pub whitelisted_domains: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BotAggregate {
    pub fn assemble(
        bot: &Bot,
        company: &Company,
        knowledge_items: Vec<KnowledgeItem>,
        domains: Vec<WhitelistedDomain>,
    ) -> Self {
        Self {
            id: bot.id,
            name: bot.name.clone(),
            tone: bot.tone,
            company: company.summary(),
            knowledge_items,
            whitelisted_domains: domains.into_iter().map(|d| d.domain).collect(),
            created_at: bot.created_at,
            updated_at: bot.updated_at,
        }
    }
}

/// Bot header used by the status endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BotSummary {
    pub id: Uuid,
    pub name: String,
    pub tone: Tone,
    pub company: CompanySummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BotSummary {
    pub fn new(bot: &Bot, company: &Company) -> Self {
        Self {
            id: bot.id,
            name: bot.name.clone(),
            tone: bot.tone,
            company: company.summary(),
            created_at: bot.created_at,
            updated_at: bot.updated_at,
        }
    }
}
