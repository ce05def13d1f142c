use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use sqlx::postgres::PgRow;
use uuid::Uuid;
use brandbot_common::models::WhitelistedDomain;
pub(crate) use brandbot_common::traits::repository_traits::WhitelistedDomainRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresWhitelistedDomainRepository {
    pool: Pool<Postgres>,
}

impl PostgresWhitelistedDomainRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn domain_from_row(r: &PgRow) -> Result<WhitelistedDomain, Error> {
    Ok(WhitelistedDomain {
        id: r.try_get("domain_id")?,
        bot_id: r.try_get("bot_id")?,
        domain: r.try_get("domain")?,
        created_at: r.try_get("created_at")?,
    })
}

#[async_trait]
impl WhitelistedDomainRepository for PostgresWhitelistedDomainRepository {
    async fn list_domains(&self, bot_id: Uuid) -> Result<Vec<WhitelistedDomain>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT domain_id, bot_id, domain, created_at
            FROM whitelisted_domains
            WHERE bot_id = $1
            ORDER BY seq ASC
            "#,
        )
            .bind(bot_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(domain_from_row).collect()
    }

    async fn replace_domains(&self, bot_id: Uuid, domains: &[String]) -> Result<Vec<WhitelistedDomain>, Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM whitelisted_domains WHERE bot_id = $1")
            .bind(bot_id)
            .execute(&mut *tx)
            .await?;

        let mut stored = Vec::with_capacity(domains.len());
        for domain in domains {
            let row = WhitelistedDomain::new(bot_id, domain);
            let result = sqlx::query(
                r#"
                INSERT INTO whitelisted_domains (domain_id, bot_id, domain, created_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (bot_id, domain) DO NOTHING
                "#,
            )
                .bind(row.id)
                .bind(row.bot_id)
                .bind(&row.domain)
                .bind(row.created_at)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() > 0 {
                stored.push(row);
            }
        }

        tx.commit().await?;
        Ok(stored)
    }
}
