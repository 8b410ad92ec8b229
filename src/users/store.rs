use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::user::{DbUser, User};

/// Persistence seam for user records, keyed by email.
///
/// Implementations must keep single-record writes atomic; concurrent upserts
/// for the same email resolve last-writer-wins.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn upsert(&self, user: &User) -> Result<(), AppError>;
    /// Returns whether a record was removed.
    async fn delete(&self, email: &str) -> Result<bool, AppError>;
    async fn list_all(&self) -> Result<Vec<User>, AppError>;
}

pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT email, name, avatar_url, role, last_login, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn upsert(&self, user: &User) -> Result<(), AppError> {
        // Single statement keeps the write atomic at record granularity.
        sqlx::query(
            "INSERT INTO users (email, name, avatar_url, role, last_login, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(email) DO UPDATE SET \
               name = excluded.name, \
               avatar_url = excluded.avatar_url, \
               role = excluded.role, \
               last_login = excluded.last_login",
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.avatar_url)
        .bind(user.role.as_str())
        .bind(user.last_login)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, email: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, DbUser>(
            "SELECT email, name, avatar_url, role, last_login, created_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}
