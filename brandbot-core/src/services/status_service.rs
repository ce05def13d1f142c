use std::sync::Arc;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;
use brandbot_common::models::{BotSummary, Polling, TrainingState};
use crate::repositories::{BotRepository, CompanyRepository, PollingRepository};
use crate::training::TrainingPipeline;
use crate::Error;

#[derive(Debug, Clone, Serialize)]
pub struct BotStatus {
    pub bot: BotSummary,
    pub pollings: Vec<Polling>,
    pub state: TrainingState,
}

pub struct StatusService {
    companies: Arc<dyn CompanyRepository>,
    bots: Arc<dyn BotRepository>,
    pollings: Arc<dyn PollingRepository>,
    pipeline: Arc<TrainingPipeline>,
}

impl StatusService {
    pub fn new(
        companies: Arc<dyn CompanyRepository>,
        bots: Arc<dyn BotRepository>,
        pollings: Arc<dyn PollingRepository>,
        pipeline: Arc<TrainingPipeline>,
    ) -> Self {
        Self { companies, bots, pollings, pipeline }
    }

    /// Returns the bot's full polling log, oldest first.
    ///
    /// A bot with no log at all has never been trained; reading it starts a
    /// run and returns the (still empty) log. The lease keeps concurrent reads
    /// from starting more than one run. Looked up by id alone; no tenant
    /// context is needed to poll.
    pub async fn get_status(&self, bot_id: Uuid) -> Result<BotStatus, Error> {
        let bot = self
            .bots
            .get_bot(bot_id)
            .await?
            .ok_or_else(|| Error::NotFound("Bot not found".into()))?;
        // The company can vanish between the two reads; treat it as a gone bot.
        let company = self
            .companies
            .get_company(bot.company_id)
            .await?
            .ok_or_else(|| Error::NotFound("Bot not found".into()))?;

        let pollings = self.pollings.list_pollings(bot.id).await?;
        if pollings.is_empty() {
            info!("Bot={} has no training history, starting a run", bot.id);
            if let Err(e) = self.pipeline.start_training(&bot).await {
                error!("Recovery training for bot={} failed to start: {:?}", bot.id, e);
            }
        }

        let state = TrainingState::from_log(&pollings);
        Ok(BotStatus {
            bot: BotSummary::new(&bot, &company),
            pollings,
            state,
        })
    }
}
