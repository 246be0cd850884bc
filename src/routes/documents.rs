//! Document API routes
//!
//! Upload, list, retrieval-URL, rename, and delete endpoints for PDF
//! documents. Every handler derives the owner from the bearer token and
//! goes through owner-scoped registry lookups.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::{Document, DocumentRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Maximum accepted upload size (bytes)
const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Create the documents router
pub fn router(state: AppState) -> Router {
    let auth = state.auth().clone();

    Router::new()
        .route("/", get(list_documents))
        .route("/upload", post(upload_document))
        .route("/:external_id", get(get_document))
        .route("/:external_id/rename", put(rename_document))
        .route("/:external_id", delete(delete_document))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(Extension(state))
        .layer(Extension(auth))
}

#[derive(Deserialize)]
struct ListQuery {
    q: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    external_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentDetailResponse {
    id: String,
    display_name: String,
    external_id: String,
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest {
    new_name: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

/// List the caller's documents, optionally filtered by name substring
async fn list_documents(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Document>>> {
    let repo = DocumentRepository::new(state.db());
    let documents = repo.list(&user.id, query.q.as_deref()).await?;
    Ok(Json(documents))
}

/// Upload a new PDF
///
/// Expects a multipart form with the file in a field named `pdf`. The
/// blob is stored first; the registry row is only created once the
/// store has acknowledged the bytes.
async fn upload_document(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?
    {
        if field.name() != Some("pdf") {
            continue;
        }

        let display_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "document.pdf".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file data: {}", e)))?;

        if data.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        let stored = state.s3_client().put_document(data.to_vec()).await?;

        let repo = DocumentRepository::new(state.db());
        let document = match repo
            .create(
                &user.id,
                &stored.external_id,
                &display_name,
                stored.storage_version.as_deref(),
            )
            .await
        {
            Ok(document) => document,
            Err(e) => {
                // The blob is already stored; try not to leak it
                if let Err(cleanup) = state
                    .s3_client()
                    .delete_object(&stored.external_id, stored.storage_version.as_deref())
                    .await
                {
                    tracing::error!(
                        external_id = %stored.external_id,
                        "Failed to clean up blob after registry error: {}",
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            user_id = %user.id,
            external_id = %document.external_id,
            display_name = %document.display_name,
            "Uploaded document"
        );

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                external_id: document.external_id,
            }),
        ));
    }

    Err(AppError::Validation("No file uploaded".to_string()))
}

/// Get a document and a version-pinned retrieval URL
async fn get_document(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Path(external_id): Path<String>,
) -> Result<Json<DocumentDetailResponse>> {
    let repo = DocumentRepository::new(state.db());
    let document = repo
        .get_by_external_id(&user.id, &external_id)
        .await?
        .ok_or_else(|| AppError::NotFound("PDF not found".to_string()))?;

    let url = state
        .s3_client()
        .presigned_url(&document.external_id, document.storage_version.as_deref())
        .await?;

    Ok(Json(DocumentDetailResponse {
        id: document.id,
        display_name: document.display_name,
        external_id: document.external_id,
        url,
    }))
}

/// Rename a document
async fn rename_document(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Path(external_id): Path<String>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<MessageResponse>> {
    let new_name = request.new_name.trim();
    if new_name.is_empty() {
        return Err(AppError::Validation("New name must not be empty".to_string()));
    }

    let repo = DocumentRepository::new(state.db());
    repo.rename(&user.id, &external_id, new_name).await?;

    Ok(Json(MessageResponse {
        message: "PDF renamed successfully".to_string(),
    }))
}

/// Delete a document, its blob, and all of its highlights
///
/// Order: blob first, then registry row + highlight cascade in one
/// transaction. A blob-delete failure aborts before any registry
/// mutation, so the registry never forgets a blob that still exists.
async fn delete_document(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Path(external_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let repo = DocumentRepository::new(state.db());
    let document = repo
        .get_by_external_id(&user.id, &external_id)
        .await?
        .ok_or_else(|| AppError::NotFound("PDF not found".to_string()))?;

    state
        .s3_client()
        .delete_object(&document.external_id, document.storage_version.as_deref())
        .await?;

    repo.delete_with_highlights(&document.id).await?;

    tracing::info!(
        user_id = %user.id,
        external_id = %document.external_id,
        "Deleted document"
    );

    Ok(Json(MessageResponse {
        message: "PDF deleted successfully".to_string(),
    }))
}
