//! HTTP handlers for blob payload transfer.
//! Streams bodies in both directions to avoid buffering in memory and
//! delegates storage concerns to `BlobStore`.

use crate::{errors::AppError, models::blob::Blob, state::AppState};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use std::io;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Query params carried by signed access URLs.
#[derive(Debug, Deserialize)]
pub struct BlobAccessQuery {
    pub expires: i64,
    pub sig: String,
}

/// PUT `/upload/{token}` — accept a streamed upload against a ticket.
pub async fn accept_upload(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));

    let blob = state.blobs.accept_upload(token, content_type, stream).await?;
    Ok((StatusCode::CREATED, Json(blob)))
}

/// GET `/blobs/{id}` — stream a payload out once the signature checks.
pub async fn fetch_blob(
    State(state): State<AppState>,
    Path(blob_id): Path<Uuid>,
    Query(query): Query<BlobAccessQuery>,
) -> Result<Response, AppError> {
    state
        .blobs
        .verify_access(&blob_id, query.expires, &query.sig)?;
    let (meta, file) = state.blobs.open_blob(&blob_id).await?;

    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_blob_headers(response.headers_mut(), &meta);

    Ok(response)
}

fn set_blob_headers(headers: &mut HeaderMap, meta: &Blob) {
    let content_type = meta
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".into());
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&meta.size_bytes.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    let quoted = format!("\"{}\"", meta.etag);
    if let Ok(value) = HeaderValue::from_str(&quoted) {
        headers.insert(header::ETAG, value);
    }

    headers.insert(
        header::LAST_MODIFIED,
        HeaderValue::from_str(&meta.created_at.to_rfc2822())
            .unwrap_or_else(|_| HeaderValue::from_static("")),
    );
}
