use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;
use brandbot_common::models::{LeaseOutcome, TrainingLease};
pub(crate) use brandbot_common::traits::repository_traits::TrainingLeaseRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresTrainingLeaseRepository {
    pool: Pool<Postgres>,
}

impl PostgresTrainingLeaseRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrainingLeaseRepository for PostgresTrainingLeaseRepository {
    async fn try_acquire(
        &self,
        bot_id: Uuid,
        run_id: Uuid,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<LeaseOutcome, Error> {
        // The upsert only overwrites an existing row once it has expired, so
        // RETURNING yields nothing while another run holds a live lease.
        for _ in 0..2 {
            let acquired = sqlx::query(
                r#"
                INSERT INTO training_leases (bot_id, run_id, acquired_at, expires_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (bot_id)
                DO UPDATE SET
                   run_id      = EXCLUDED.run_id,
                   acquired_at = EXCLUDED.acquired_at,
                   expires_at  = EXCLUDED.expires_at
                WHERE training_leases.expires_at <= EXCLUDED.acquired_at
                RETURNING run_id
                "#,
            )
                .bind(bot_id)
                .bind(run_id)
                .bind(now)
                .bind(expires_at)
                .fetch_optional(&self.pool)
                .await?;

            if acquired.is_some() {
                return Ok(LeaseOutcome::Acquired);
            }

            // Released between the two statements => try the insert again.
            if let Some(lease) = self.get_lease(bot_id).await? {
                return Ok(LeaseOutcome::Held { run_id: lease.run_id });
            }
        }

        Err(Error::Conflict(format!("training lease for bot {} is contended", bot_id)))
    }

    async fn release(&self, bot_id: Uuid, run_id: Uuid) -> Result<(), Error> {
        sqlx::query("DELETE FROM training_leases WHERE bot_id = $1 AND run_id = $2")
            .bind(bot_id)
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_lease(&self, bot_id: Uuid) -> Result<Option<TrainingLease>, Error> {
        let row = sqlx::query(
            r#"
            SELECT bot_id, run_id, acquired_at, expires_at
            FROM training_leases
            WHERE bot_id = $1
            "#,
        )
            .bind(bot_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(r) = row {
            Ok(Some(TrainingLease {
                bot_id: r.try_get("bot_id")?,
                run_id: r.try_get("run_id")?,
                acquired_at: r.try_get("acquired_at")?,
                expires_at: r.try_get("expires_at")?,
            }))
        } else {
            Ok(None)
        }
    }
}
