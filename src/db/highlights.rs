//! Highlight database operations
//!
//! Highlights are only ever created through an owner-scoped document
//! resolution, so a highlight's owner always matches its document's
//! owner. Reads still bind both ids as a second line of defense.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::like_pattern;
use crate::error::{AppError, Result};

/// Bounding rectangle of a highlighted text span, in page-render pixel
/// coordinates relative to the top-left of the rendered page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Region {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    /// Check the geometric invariants: width and height are the
    /// non-negative side lengths of the (x1,y1)-(x2,y2) rectangle
    pub fn is_valid(&self) -> bool {
        const TOLERANCE: f64 = 1e-6;

        self.x2 >= self.x1
            && self.y2 >= self.y1
            && (self.width - (self.x2 - self.x1)).abs() <= TOLERANCE
            && (self.height - (self.y2 - self.y1)).abs() <= TOLERANCE
            && [self.x1, self.y1, self.x2, self.y2, self.width, self.height]
                .iter()
                .all(|v| v.is_finite())
    }
}

/// Highlight record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub owner_id: String,
    pub document_id: String,
    pub text: String,
    pub page_number: i64,
    #[sqlx(flatten)]
    pub region: Region,
    pub note: String,
    pub created_at: String,
    pub updated_at: String,
}

const HIGHLIGHT_COLUMNS: &str = "id, owner_id, document_id, text, page_number, \
     x1, y1, x2, y2, width, height, note, created_at, updated_at";

/// Highlight repository
pub struct HighlightRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> HighlightRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a highlight by id, scoped to its owner
    pub async fn get(&self, owner_id: &str, id: &str) -> Result<Option<Highlight>> {
        let highlight = sqlx::query_as::<_, Highlight>(&format!(
            "SELECT {HIGHLIGHT_COLUMNS} FROM highlights WHERE id = ? AND owner_id = ?"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(highlight)
    }

    /// Create a new highlight
    ///
    /// `document_id` must come from an owner-scoped document lookup;
    /// this is what ties the highlight's owner to the document's owner.
    pub async fn create(
        &self,
        owner_id: &str,
        document_id: &str,
        text: &str,
        page_number: i64,
        region: &Region,
    ) -> Result<Highlight> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO highlights
                (id, owner_id, document_id, text, page_number, x1, y1, x2, y2, width, height, note, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '', ?, ?)
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(document_id)
        .bind(text)
        .bind(page_number)
        .bind(region.x1)
        .bind(region.y1)
        .bind(region.x2)
        .bind(region.y2)
        .bind(region.width)
        .bind(region.height)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.get(owner_id, &id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created highlight".to_string()))
    }

    /// List highlights for a document, optionally filtered by a
    /// case-insensitive substring of the highlighted text
    ///
    /// `document_id` must come from an owner-scoped lookup, so there is
    /// no cross-document or cross-user leakage here.
    pub async fn list_for_document(
        &self,
        owner_id: &str,
        document_id: &str,
        text_filter: Option<&str>,
    ) -> Result<Vec<Highlight>> {
        let highlights = match text_filter {
            Some(q) if !q.is_empty() => {
                sqlx::query_as::<_, Highlight>(&format!(
                    r#"
                    SELECT {HIGHLIGHT_COLUMNS}
                    FROM highlights
                    WHERE document_id = ? AND owner_id = ? AND text LIKE ? ESCAPE '\'
                    ORDER BY page_number ASC, created_at ASC
                    "#
                ))
                .bind(document_id)
                .bind(owner_id)
                .bind(like_pattern(q))
                .fetch_all(self.pool)
                .await?
            }
            _ => {
                sqlx::query_as::<_, Highlight>(&format!(
                    r#"
                    SELECT {HIGHLIGHT_COLUMNS}
                    FROM highlights
                    WHERE document_id = ? AND owner_id = ?
                    ORDER BY page_number ASC, created_at ASC
                    "#
                ))
                .bind(document_id)
                .bind(owner_id)
                .fetch_all(self.pool)
                .await?
            }
        };

        Ok(highlights)
    }

    /// Set a highlight's note, bumping `updated_at`
    pub async fn update_note(&self, owner_id: &str, id: &str, note: &str) -> Result<Highlight> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE highlights SET note = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
        )
        .bind(note)
        .bind(&now)
        .bind(id)
        .bind(owner_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Highlight not found".to_string()));
        }

        self.get(owner_id, id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch updated highlight".to_string()))
    }

    /// Delete a highlight
    pub async fn delete(&self, owner_id: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM highlights WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, DocumentRepository, UserRepository};

    fn region() -> Region {
        Region {
            x1: 10.0,
            y1: 20.0,
            x2: 110.0,
            y2: 40.0,
            width: 100.0,
            height: 20.0,
        }
    }

    async fn setup() -> (SqlitePool, String, String) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let user = UserRepository::new(&pool)
            .create("Ann", "a@x.com", "hash")
            .await
            .unwrap();
        let doc = DocumentRepository::new(&pool)
            .create(&user.id, "abc123", "notes.pdf", None)
            .await
            .unwrap();
        (pool, user.id, doc.id)
    }

    #[test]
    fn test_region_validation() {
        assert!(region().is_valid());

        let mut inverted = region();
        inverted.x2 = 5.0;
        assert!(!inverted.is_valid());

        let mut inconsistent = region();
        inconsistent.width = 50.0;
        assert!(!inconsistent.is_valid());

        let mut nan = region();
        nan.y1 = f64::NAN;
        assert!(!nan.is_valid());
    }

    #[tokio::test]
    async fn test_create_list_round_trip() {
        let (pool, owner, doc_id) = setup().await;
        let repo = HighlightRepository::new(&pool);

        repo.create(&owner, &doc_id, "important", 2, &region())
            .await
            .unwrap();

        let listed = repo.list_for_document(&owner, &doc_id, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].text, "important");
        assert_eq!(listed[0].page_number, 2);
        assert_eq!(listed[0].region, region());
        assert_eq!(listed[0].note, "");
    }

    #[tokio::test]
    async fn test_text_filter_case_insensitive_substring() {
        let (pool, owner, doc_id) = setup().await;
        let repo = HighlightRepository::new(&pool);

        repo.create(&owner, &doc_id, "Hello World", 1, &region())
            .await
            .unwrap();

        for q in ["hello", "LO WO"] {
            let hits = repo
                .list_for_document(&owner, &doc_id, Some(q))
                .await
                .unwrap();
            assert_eq!(hits.len(), 1, "filter {:?} should match", q);
        }

        assert!(repo
            .list_for_document(&owner, &doc_id, Some("xyz"))
            .await
            .unwrap()
            .is_empty());

        // Empty filter behaves like no filter
        let unfiltered = repo.list_for_document(&owner, &doc_id, None).await.unwrap();
        let empty = repo
            .list_for_document(&owner, &doc_id, Some(""))
            .await
            .unwrap();
        assert_eq!(unfiltered.len(), empty.len());
    }

    #[tokio::test]
    async fn test_update_note() {
        let (pool, owner, doc_id) = setup().await;
        let repo = HighlightRepository::new(&pool);

        let created = repo
            .create(&owner, &doc_id, "text", 1, &region())
            .await
            .unwrap();
        let updated = repo
            .update_note(&owner, &created.id, "my note")
            .await
            .unwrap();
        assert_eq!(updated.note, "my note");

        // Clearing the note stores the empty string
        let cleared = repo.update_note(&owner, &created.id, "").await.unwrap();
        assert_eq!(cleared.note, "");
    }

    #[tokio::test]
    async fn test_owner_scoping() {
        let (pool, owner, doc_id) = setup().await;
        let other = UserRepository::new(&pool)
            .create("Bob", "b@x.com", "hash")
            .await
            .unwrap();
        let repo = HighlightRepository::new(&pool);

        let created = repo
            .create(&owner, &doc_id, "secret", 1, &region())
            .await
            .unwrap();

        assert!(repo.get(&other.id, &created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.update_note(&other.id, &created.id, "x").await,
            Err(AppError::NotFound(_))
        ));
        assert!(!repo.delete(&other.id, &created.id).await.unwrap());

        // Still present for the real owner
        assert!(repo.get(&owner, &created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_document_cascade() {
        let (pool, owner, doc_id) = setup().await;
        let highlights = HighlightRepository::new(&pool);
        let documents = DocumentRepository::new(&pool);

        let h1 = highlights
            .create(&owner, &doc_id, "one", 1, &region())
            .await
            .unwrap();
        let h2 = highlights
            .create(&owner, &doc_id, "two", 2, &region())
            .await
            .unwrap();

        documents.delete_with_highlights(&doc_id).await.unwrap();

        assert!(documents
            .get_by_external_id(&owner, "abc123")
            .await
            .unwrap()
            .is_none());
        assert!(highlights.get(&owner, &h1.id).await.unwrap().is_none());
        assert!(highlights.get(&owner, &h2.id).await.unwrap().is_none());
    }
}
