//! HTTP handlers for publications and their comment threads.

use crate::{
    auth::MaybeIdentity,
    errors::AppError,
    services::publication_service::{
        AddCommentParams, CreatePublicationParams, ListPublicationsParams, SetPublishedParams,
    },
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

/// Query params accepted by the publication listing.
#[derive(Debug, Deserialize)]
pub struct ListPublicationsQuery {
    pub creator_id: Option<Uuid>,
    pub published: Option<bool>,
}

/// POST `/publications` — create a publication over the caller's files.
pub async fn create_publication(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    Json(params): Json<CreatePublicationParams>,
) -> Result<impl IntoResponse, AppError> {
    let publication = state
        .publications
        .create(identity.as_ref(), params)
        .await?;
    Ok((StatusCode::CREATED, Json(publication)))
}

/// GET `/publications` — list publications, newest first.
pub async fn list_publications(
    State(state): State<AppState>,
    Query(query): Query<ListPublicationsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let publications = state
        .publications
        .list(ListPublicationsParams {
            creator_id: query.creator_id,
            is_published: query.published,
        })
        .await?;
    Ok(Json(publications))
}

/// GET `/publications/{id}` — one publication with file refs and cover.
pub async fn get_publication(
    State(state): State<AppState>,
    Path(publication_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let publication = state.publications.get(publication_id).await?;
    Ok(Json(publication))
}

/// POST `/publications/{id}/publish` — flip the published flag.
pub async fn set_publication_published(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    Path(publication_id): Path<Uuid>,
    Json(params): Json<SetPublishedParams>,
) -> Result<impl IntoResponse, AppError> {
    let publication = state
        .publications
        .set_published(identity.as_ref(), publication_id, params)
        .await?;
    Ok(Json(publication))
}

/// POST `/publications/{id}/comments` — post a comment.
pub async fn add_comment(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    Path(publication_id): Path<Uuid>,
    Json(params): Json<AddCommentParams>,
) -> Result<impl IntoResponse, AppError> {
    let comment = state
        .publications
        .add_comment(identity.as_ref(), publication_id, params)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET `/publications/{id}/comments` — the comment thread, oldest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(publication_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let comments = state.publications.comments(publication_id).await?;
    Ok(Json(comments))
}
