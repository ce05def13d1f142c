use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use sqlx::postgres::PgRow;
use uuid::Uuid;
use brandbot_common::models::Company;
pub(crate) use brandbot_common::traits::repository_traits::CompanyRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresCompanyRepository {
    pool: Pool<Postgres>,
}

impl PostgresCompanyRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn company_from_row(r: &PgRow) -> Result<Company, Error> {
    Ok(Company {
        id: r.try_get("company_id")?,
        name: r.try_get("name")?,
        primary_color: r.try_get("primary_color")?,
        secondary_color: r.try_get("secondary_color")?,
        logo_url: r.try_get("logo_url")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl CompanyRepository for PostgresCompanyRepository {
    async fn create_company(&self, company: &Company) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO companies (
                company_id,
                name,
                primary_color,
                secondary_color,
                logo_url,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
            .bind(company.id)
            .bind(&company.name)
            .bind(&company.primary_color)
            .bind(&company.secondary_color)
            .bind(&company.logo_url)
            .bind(company.created_at)
            .bind(company.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>, Error> {
        let row = sqlx::query(
            r#"
            SELECT company_id, name, primary_color, secondary_color, logo_url, created_at, updated_at
            FROM companies
            WHERE company_id = $1
            "#,
        )
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(company_from_row).transpose()
    }

    async fn first_company(&self) -> Result<Option<Company>, Error> {
        let row = sqlx::query(
            r#"
            SELECT company_id, name, primary_color, secondary_color, logo_url, created_at, updated_at
            FROM companies
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(company_from_row).transpose()
    }

    async fn update_company(&self, company: &Company) -> Result<(), Error> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE companies
            SET name            = $1,
                primary_color   = $2,
                secondary_color = $3,
                logo_url        = $4,
                updated_at      = $5
            WHERE company_id = $6
            "#,
        )
            .bind(&company.name)
            .bind(&company.primary_color)
            .bind(&company.secondary_color)
            .bind(&company.logo_url)
            .bind(now)
            .bind(company.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Company not found".into()));
        }
        Ok(())
    }

    async fn delete_company(&self, company_id: Uuid) -> Result<(), Error> {
        sqlx::query("DELETE FROM companies WHERE company_id = $1")
            .bind(company_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
