//! HTTP handlers for account sync and lookup.

use crate::{
    auth::MaybeIdentity, errors::AppError, services::user_service::SyncUserParams,
    state::AppState,
};
use axum::{Json, extract::State, response::IntoResponse};

/// POST `/users/sync` — create the caller's account on first contact,
/// update profile fields afterwards.
pub async fn sync_user(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    Json(params): Json<SyncUserParams>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users.sync(identity.as_ref(), params).await?;
    Ok(Json(user))
}

/// GET `/users/me` — resolve the caller's account.
pub async fn current_user(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users.current(identity.as_ref()).await?;
    Ok(Json(user))
}
