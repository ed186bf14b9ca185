//! HTTP handlers for file records and upload tickets.
//! Thin adapters: extract the caller identity and arguments, then
//! delegate record concerns to `FileService` and ticket issuance to
//! `BlobStore`.

use crate::{
    auth::MaybeIdentity,
    errors::AppError,
    models::file::FileType,
    services::file_service::{CreateFileParams, ListFilesParams},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

/// Query params accepted by the file listing.
#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub file_type: Option<FileType>,
    pub published: Option<bool>,
}

/// POST `/files/upload-url` — issue a one-time upload ticket.
pub async fn request_upload_url(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
) -> Result<impl IntoResponse, AppError> {
    let grant = state.blobs.issue_upload_ticket(identity.as_ref()).await?;
    Ok(Json(grant))
}

/// POST `/files` — insert a file record for the caller.
pub async fn create_file(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    Json(params): Json<CreateFileParams>,
) -> Result<impl IntoResponse, AppError> {
    let file = state.files.create_file(identity.as_ref(), params).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// GET `/files` — list a user's files, filters optional and conjunctive.
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListFilesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let files = state
        .files
        .list_files(ListFilesParams {
            user_id: query.user_id,
            file_type: query.file_type,
            is_published: query.published,
        })
        .await?;
    Ok(Json(files))
}

/// DELETE `/files/{id}` — tombstone and remove an owned file.
pub async fn delete_file(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let tombstone = state.files.delete_file(identity.as_ref(), file_id).await?;
    Ok(Json(tombstone))
}

/// POST `/files/{id}/restore` — reset an owned live file to unpublished.
pub async fn restore_file(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let file = state.files.restore_file(identity.as_ref(), file_id).await?;
    Ok(Json(file))
}

/// GET `/files/deleted` — the caller's tombstones, newest first.
pub async fn list_deleted_files(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
) -> Result<impl IntoResponse, AppError> {
    let tombstones = state.files.deleted_files(identity.as_ref()).await?;
    Ok(Json(tombstones))
}
