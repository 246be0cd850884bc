//! User account database operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// User record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// User repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user account
    ///
    /// Fails with `Conflict` if the email is already registered. The
    /// UNIQUE constraint is the source of truth, so concurrent
    /// duplicate registrations also surface as `Conflict`.
    pub async fn create(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(&now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                AppError::Conflict(format!("Email already registered: {}", email))
            } else {
                AppError::Database(e)
            }
        })?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created user".to_string()))
    }

    /// Get a user by id
    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Look up a user by email (for login)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let repo = UserRepository::new(&pool);

        let user = repo.create("Ann", "a@x.com", "hash").await.unwrap();
        assert_eq!(user.name, "Ann");
        assert_eq!(user.email, "a@x.com");

        let found = repo.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let repo = UserRepository::new(&pool);

        repo.create("Ann", "a@x.com", "hash").await.unwrap();
        let err = repo.create("Other Ann", "a@x.com", "hash2").await;
        assert!(matches!(err, Err(crate::error::AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unknown_email() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let repo = UserRepository::new(&pool);

        assert!(repo.find_by_email("nobody@x.com").await.unwrap().is_none());
    }
}
