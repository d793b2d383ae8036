//! Sales and purchase document routes.
//!
//! Documents are drafts until posted. Posting is the only route that touches the stock and
//! account ledgers, and it does so atomically.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use makhzan_core::consistency::PostedDocument;
use makhzan_core::document::{
    Document, DocumentFilter, DocumentUpdate, NewDocument, PostingOptions,
};
use makhzan_shared::types::DocumentId;

use crate::{AppState, error::ApiError};

/// Creates the document routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route(
            "/documents/{document_id}",
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .route("/documents/{document_id}/post", post(post_document))
}

/// Query parameters for posting a document.
#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    /// Override the configured negative-stock policy for this posting.
    pub allow_negative_stock: Option<bool>,
}

/// GET `/documents` - List documents, newest first.
async fn list_documents(
    State(state): State<AppState>,
    Query(filter): Query<DocumentFilter>,
) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.service.list_documents(&filter).await?))
}

/// POST `/documents` - Create a draft.
async fn create_document(
    State(state): State<AppState>,
    Json(payload): Json<NewDocument>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let document = state.service.create_document(payload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET `/documents/{document_id}` - Get a document with its lines.
async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.service.get_document(document_id).await?))
}

/// PATCH `/documents/{document_id}` - Edit a draft.
async fn update_document(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
    Json(payload): Json<DocumentUpdate>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(
        state.service.update_document(document_id, payload).await?,
    ))
}

/// DELETE `/documents/{document_id}` - Delete a draft.
async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_document(document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/documents/{document_id}/post` - Post a draft to the stock and account ledgers.
async fn post_document(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
    Query(query): Query<PostQuery>,
) -> Result<Json<PostedDocument>, ApiError> {
    let posted = match query.allow_negative_stock {
        Some(allow_negative_stock) => {
            state
                .service
                .post_document_with(document_id, PostingOptions { allow_negative_stock })
                .await?
        }
        None => state.service.post_document(document_id).await?,
    };
    Ok(Json(posted))
}
