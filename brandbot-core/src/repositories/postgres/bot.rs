use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use sqlx::postgres::PgRow;
use uuid::Uuid;
use brandbot_common::models::{Bot, KnowledgeItem, KnowledgeItemType, Tone};
pub(crate) use brandbot_common::traits::repository_traits::BotRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresBotRepository {
    pool: Pool<Postgres>,
}

impl PostgresBotRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn bot_from_row(r: &PgRow) -> Result<Bot, Error> {
    let tone: String = r.try_get("tone")?;
    Ok(Bot {
        id: r.try_get("bot_id")?,
        company_id: r.try_get("company_id")?,
        name: r.try_get("name")?,
        tone: tone.parse::<Tone>()?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn knowledge_item_from_row(r: &PgRow) -> Result<KnowledgeItem, Error> {
    let item_type: String = r.try_get("item_type")?;
    Ok(KnowledgeItem {
        id: r.try_get("knowledge_item_id")?,
        bot_id: r.try_get("bot_id")?,
        item_type: item_type.parse::<KnowledgeItemType>()?,
        content: r.try_get("content")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl BotRepository for PostgresBotRepository {
    async fn create_bot_with_items(&self, bot: &Bot, items: &[KnowledgeItem]) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bots (bot_id, company_id, name, tone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
            .bind(bot.id)
            .bind(bot.company_id)
            .bind(&bot.name)
            .bind(bot.tone.to_string())
            .bind(bot.created_at)
            .bind(bot.updated_at)
            .execute(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO knowledge_items (
                    knowledge_item_id,
                    bot_id,
                    item_type,
                    content,
                    created_at,
                    updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
                .bind(item.id)
                .bind(item.bot_id)
                .bind(item.item_type.to_string())
                .bind(&item.content)
                .bind(item.created_at)
                .bind(item.updated_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_bot(&self, bot_id: Uuid) -> Result<Option<Bot>, Error> {
        let row = sqlx::query(
            r#"
            SELECT bot_id, company_id, name, tone, created_at, updated_at
            FROM bots
            WHERE bot_id = $1
            "#,
        )
            .bind(bot_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(bot_from_row).transpose()
    }

    async fn list_bots_for_company(&self, company_id: Uuid) -> Result<Vec<Bot>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT bot_id, company_id, name, tone, created_at, updated_at
            FROM bots
            WHERE company_id = $1
            ORDER BY created_at DESC, seq DESC
            "#,
        )
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(bot_from_row).collect()
    }

    async fn list_knowledge_items(&self, bot_id: Uuid) -> Result<Vec<KnowledgeItem>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT knowledge_item_id, bot_id, item_type, content, created_at, updated_at
            FROM knowledge_items
            WHERE bot_id = $1
            ORDER BY seq ASC
            "#,
        )
            .bind(bot_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(knowledge_item_from_row).collect()
    }
}
