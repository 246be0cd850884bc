//! Highlight API routes
//!
//! Highlights are always addressed through the owning user and, for
//! creation and listing, through the document's external id. The
//! document is resolved with an owner-scoped lookup before any
//! highlight row is touched; a client-supplied document reference is
//! never trusted directly.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::auth::{AuthContext, AuthUser};
use crate::db::{DocumentRepository, Highlight, HighlightRepository, Region};
use crate::error::{AppError, Result};

/// Extended state with database pool
#[derive(Clone)]
pub struct HighlightsState {
    pub pool: SqlitePool,
}

/// Create the highlights router
pub fn router(pool: SqlitePool, auth: AuthContext) -> Router {
    let state = HighlightsState { pool };

    // The bare parameter segment is a document external id for GET and
    // a highlight id for PUT/DELETE, mirroring the public API shape
    Router::new()
        .route("/", post(create_highlight))
        .route("/search/:document_external_id", get(search_highlights))
        .route(
            "/:id",
            get(list_highlights)
                .put(update_note)
                .delete(delete_highlight),
        )
        .layer(Extension(state))
        .layer(Extension(auth))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateHighlightRequest {
    document_external_id: String,
    text: String,
    page_number: i64,
    region: Region,
}

#[derive(Deserialize)]
struct UpdateNoteRequest {
    /// Omitted or null clears the note
    note: Option<String>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

/// Resolve a document through an owner-scoped lookup, returning its
/// internal id
async fn resolve_document(
    pool: &SqlitePool,
    owner_id: &str,
    external_id: &str,
) -> Result<String> {
    let document = DocumentRepository::new(pool)
        .get_by_external_id(owner_id, external_id)
        .await?
        .ok_or_else(|| AppError::NotFound("PDF not found".to_string()))?;

    Ok(document.id)
}

/// Create a new highlight
async fn create_highlight(
    Extension(state): Extension<HighlightsState>,
    user: AuthUser,
    Json(request): Json<CreateHighlightRequest>,
) -> Result<(StatusCode, Json<Highlight>)> {
    if request.text.is_empty() {
        return Err(AppError::Validation(
            "Highlight text must not be empty".to_string(),
        ));
    }
    if request.page_number < 1 {
        return Err(AppError::Validation(
            "Page number must be 1 or greater".to_string(),
        ));
    }
    if !request.region.is_valid() {
        return Err(AppError::Validation(
            "Region is not a valid bounding rectangle".to_string(),
        ));
    }

    let document_id =
        resolve_document(&state.pool, &user.id, &request.document_external_id).await?;

    let repo = HighlightRepository::new(&state.pool);
    let highlight = repo
        .create(
            &user.id,
            &document_id,
            &request.text,
            request.page_number,
            &request.region,
        )
        .await?;

    tracing::info!(
        user_id = %user.id,
        highlight_id = %highlight.id,
        page = request.page_number,
        "Created highlight"
    );

    Ok((StatusCode::CREATED, Json(highlight)))
}

/// List all highlights for a document
async fn list_highlights(
    Extension(state): Extension<HighlightsState>,
    user: AuthUser,
    Path(document_external_id): Path<String>,
) -> Result<Json<Vec<Highlight>>> {
    let document_id = resolve_document(&state.pool, &user.id, &document_external_id).await?;

    let repo = HighlightRepository::new(&state.pool);
    let highlights = repo
        .list_for_document(&user.id, &document_id, None)
        .await?;

    Ok(Json(highlights))
}

/// Search a document's highlights by text substring
async fn search_highlights(
    Extension(state): Extension<HighlightsState>,
    user: AuthUser,
    Path(document_external_id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Highlight>>> {
    let document_id = resolve_document(&state.pool, &user.id, &document_external_id).await?;

    let repo = HighlightRepository::new(&state.pool);
    let highlights = repo
        .list_for_document(&user.id, &document_id, query.q.as_deref())
        .await?;

    Ok(Json(highlights))
}

/// Update a highlight's note
async fn update_note(
    Extension(state): Extension<HighlightsState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateNoteRequest>,
) -> Result<Json<Highlight>> {
    let repo = HighlightRepository::new(&state.pool);
    let highlight = repo
        .update_note(&user.id, &id, request.note.as_deref().unwrap_or(""))
        .await?;

    Ok(Json(highlight))
}

/// Delete a highlight
async fn delete_highlight(
    Extension(state): Extension<HighlightsState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let repo = HighlightRepository::new(&state.pool);
    let deleted = repo.delete(&user.id, &id).await?;

    if !deleted {
        return Err(AppError::NotFound("Highlight not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Highlight deleted successfully".to_string(),
    }))
}
