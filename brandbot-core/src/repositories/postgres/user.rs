use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use sqlx::postgres::PgRow;
use uuid::Uuid;
use brandbot_common::models::User;
pub(crate) use brandbot_common::traits::repository_traits::UserRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: Pool<Postgres>,
}

impl PostgresUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn user_from_row(r: &PgRow) -> Result<User, Error> {
    Ok(User {
        id: r.try_get("user_id")?,
        email: r.try_get("email")?,
        username: r.try_get("username")?,
        password_hash: r.try_get("password_hash")?,
        first_name: r.try_get("first_name")?,
        last_name: r.try_get("last_name")?,
        company_id: r.try_get("company_id")?,
        profile_picture_url: r.try_get("profile_picture_url")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                email,
                username,
                password_hash,
                first_name,
                last_name,
                company_id,
                profile_picture_url,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.company_id)
            .bind(&user.profile_picture_url)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                // 23505 => unique_violation on users.email
                if let Some(db_err) = e.as_database_error() {
                    if db_err.code().as_deref() == Some("23505") {
                        return Err(Error::Conflict("User with this email already exists".into()));
                    }
                }
                Err(Error::Database(e))
            }
        }
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        let row = sqlx::query(
            r#"
            SELECT user_id, email, username, password_hash, first_name, last_name,
                   company_id, profile_picture_url, created_at, updated_at
            FROM users
            WHERE user_id = $1
            "#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let row = sqlx::query(
            r#"
            SELECT user_id, email, username, password_hash, first_name, last_name,
                   company_id, profile_picture_url, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}
