//! PostgreSQL store

use super::{Store, StoreError, StoreResult, UniqueField};
use crate::models::{NewUser, ResetTokenRecord, SearchField, User, UserSummary};

use async_trait::async_trait;
use sqlx::PgPool;

/// [`Store`] backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn migrate(&self) -> StoreResult<()> {
        tracing::info!("Running authentication database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                first_name VARCHAR(50) NOT NULL,
                last_name VARCHAR(50) NOT NULL,
                email VARCHAR(255) NOT NULL,
                nick VARCHAR(50) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                avatar VARCHAR(500),
                created_at TIMESTAMPTZ DEFAULT NOW(),
                CONSTRAINT users_nick_key UNIQUE (nick)
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_key ON users (LOWER(email));",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS password_reset_tokens (
                id BIGSERIAL PRIMARY KEY,
                email VARCHAR(255) NOT NULL,
                token VARCHAR(255) NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                used BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reset_tokens_token ON password_reset_tokens(token);",
        )
        .execute(&self.db)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reset_tokens_email ON password_reset_tokens(LOWER(email));",
        )
        .execute(&self.db)
        .await?;

        tracing::info!("Authentication migrations completed successfully");
        Ok(())
    }
}

/// Translate a unique-constraint failure into the field that collided
fn classify_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(name) if name.contains("nick") => UniqueField::Nick,
                _ => UniqueField::Email,
            };
            return StoreError::UniqueViolation(field);
        }
    }
    StoreError::Database(err)
}

fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<i64> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO users (first_name, last_name, email, nick, password_hash, avatar)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.nick)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .fetch_one(&self.db)
        .await
        .map_err(classify_insert_error)?;

        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as(
            r#"
            SELECT id, first_name, last_name, email, nick, password_hash, avatar
            FROM users WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as(
            r#"
            SELECT id, first_name, last_name, email, nick, password_hash, avatar
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn search_users(&self, field: SearchField, value: &str) -> StoreResult<Vec<UserSummary>> {
        // Column name comes from a closed enum; the value is always bound.
        let sql = format!(
            "SELECT id, nick FROM users WHERE {}::text ILIKE $1 ESCAPE '\\' ORDER BY id",
            field.column()
        );

        let users = sqlx::query_as(&sql)
            .bind(like_pattern(value))
            .fetch_all(&self.db)
            .await?;
        Ok(users)
    }

    async fn insert_reset_token(&self, record: ResetTokenRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (email, token, expires_at, used) VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.email)
        .bind(&record.token)
        .bind(record.expires_at)
        .bind(record.used)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn delete_reset_tokens_by_email(&self, email: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<ResetTokenRecord>> {
        let record = sqlx::query_as(
            "SELECT email, token, expires_at, used FROM password_reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(record)
    }

    async fn take_reset_token(&self, token: &str) -> StoreResult<Option<ResetTokenRecord>> {
        let record = sqlx::query_as(
            "DELETE FROM password_reset_tokens WHERE token = $1 RETURNING email, token, expires_at, used",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(record)
    }

    async fn mark_reset_token_used(&self, email: &str) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(email = %email, "No reset token to mark as used");
        }

        Ok(())
    }
}
