//! Document registry database operations
//!
//! Every lookup is owner-scoped: the WHERE clause filters by both the
//! document identifier and the requesting user in one step, so another
//! user's document is indistinguishable from a missing one.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::like_pattern;
use crate::error::{AppError, Result};

/// Document record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub external_id: String,
    pub owner_id: String,
    pub display_name: String,
    pub storage_version: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

const DOCUMENT_COLUMNS: &str =
    "id, external_id, owner_id, display_name, storage_version, created_at, updated_at";

/// Document registry repository
pub struct DocumentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Register an uploaded document
    ///
    /// Fails with `Conflict` if `external_id` is already registered.
    /// The blob store assigns unique keys, but the uniqueness invariant
    /// is still enforced here by the UNIQUE constraint, which also
    /// holds for concurrent duplicate registrations.
    pub async fn create(
        &self,
        owner_id: &str,
        external_id: &str,
        display_name: &str,
        storage_version: Option<&str>,
    ) -> Result<Document> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO documents (id, external_id, owner_id, display_name, storage_version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(external_id)
        .bind(owner_id)
        .bind(display_name)
        .bind(storage_version)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                AppError::Conflict(format!("Document already registered: {}", external_id))
            } else {
                AppError::Database(e)
            }
        })?;

        self.get_by_external_id(owner_id, external_id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created document".to_string()))
    }

    /// List documents owned by a user, optionally filtered by a
    /// case-insensitive substring of the display name
    pub async fn list(&self, owner_id: &str, name_filter: Option<&str>) -> Result<Vec<Document>> {
        let documents = match name_filter {
            Some(q) if !q.is_empty() => {
                sqlx::query_as::<_, Document>(&format!(
                    r#"
                    SELECT {DOCUMENT_COLUMNS}
                    FROM documents
                    WHERE owner_id = ? AND display_name LIKE ? ESCAPE '\'
                    ORDER BY created_at ASC, rowid ASC
                    "#
                ))
                .bind(owner_id)
                .bind(like_pattern(q))
                .fetch_all(self.pool)
                .await?
            }
            _ => {
                sqlx::query_as::<_, Document>(&format!(
                    r#"
                    SELECT {DOCUMENT_COLUMNS}
                    FROM documents
                    WHERE owner_id = ?
                    ORDER BY created_at ASC, rowid ASC
                    "#
                ))
                .bind(owner_id)
                .fetch_all(self.pool)
                .await?
            }
        };

        Ok(documents)
    }

    /// Owner-scoped lookup by the blob-store key
    pub async fn get_by_external_id(
        &self,
        owner_id: &str,
        external_id: &str,
    ) -> Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE external_id = ? AND owner_id = ?"
        ))
        .bind(external_id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(document)
    }

    /// Rename a document
    ///
    /// The caller validates that `new_name` is non-empty after trimming.
    pub async fn rename(
        &self,
        owner_id: &str,
        external_id: &str,
        new_name: &str,
    ) -> Result<Document> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET display_name = ?, updated_at = ?
            WHERE external_id = ? AND owner_id = ?
            "#,
        )
        .bind(new_name)
        .bind(&now)
        .bind(external_id)
        .bind(owner_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("PDF not found".to_string()));
        }

        self.get_by_external_id(owner_id, external_id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch renamed document".to_string()))
    }

    /// Delete a document row and all of its highlights in one transaction
    ///
    /// The caller resolves ownership and deletes the underlying blob
    /// first; this only touches registry state.
    pub async fn delete_with_highlights(&self, document_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM highlights WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
