//! User repository: lookups and inserts for the users table.

use apksure_core::{normalize_email, AppError, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Persistence contract used by the auth gate.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by email. The email is normalized before the lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Insert a new user. Fails with `AppError::Conflict` when the normalized
    /// email already exists.
    async fn create_user(&self, email: &str, password_hash: String) -> Result<User, AppError>;
}

/// Row type for users table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for users table.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[tracing::instrument(skip(self, email), fields(db.table = "users", db.operation = "select"))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<Postgres, UserRow>(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    #[tracing::instrument(skip(self, email, password_hash), fields(db.table = "users", db.operation = "insert"))]
    async fn create_user(&self, email: &str, password_hash: String) -> Result<User, AppError> {
        let email = normalize_email(email);
        let result = sqlx::query_as::<Postgres, UserRow>(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into_user()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Conflict("An account with this email already exists".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }
}
