use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use sqlx::postgres::PgRow;
use uuid::Uuid;
use brandbot_common::models::{Polling, PollingStatus};
pub(crate) use brandbot_common::traits::repository_traits::PollingRepository;
use crate::Error;

/// Append-only access to the `pollings` table. Rows go away only with their bot.
#[derive(Clone)]
pub struct PostgresPollingRepository {
    pool: Pool<Postgres>,
}

impl PostgresPollingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn polling_from_row(r: &PgRow) -> Result<Polling, Error> {
    let status: String = r.try_get("status")?;
    Ok(Polling {
        id: r.try_get("polling_id")?,
        bot_id: r.try_get("bot_id")?,
        run_id: r.try_get("run_id")?,
        status: status.parse::<PollingStatus>()?,
        completed: r.try_get("completed")?,
        error: r.try_get("error")?,
        success: r.try_get("success")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl PollingRepository for PostgresPollingRepository {
    async fn insert_polling(&self, polling: &Polling) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO pollings (
                polling_id,
                bot_id,
                run_id,
                status,
                completed,
                error,
                success,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
            .bind(polling.id)
            .bind(polling.bot_id)
            .bind(polling.run_id)
            .bind(polling.status.to_string())
            .bind(polling.completed)
            .bind(&polling.error)
            .bind(polling.success)
            .bind(polling.created_at)
            .bind(polling.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_pollings(&self, bot_id: Uuid) -> Result<Vec<Polling>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT polling_id, bot_id, run_id, status, completed, error, success, created_at, updated_at
            FROM pollings
            WHERE bot_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
            .bind(bot_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(polling_from_row).collect()
    }
}
