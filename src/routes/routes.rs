//! Defines routes for all file, blob, user, and publication operations.
//!
//! ## Structure
//! - **File endpoints**
//!   - `POST   /files/upload-url` — issue a one-time upload ticket
//!   - `POST   /files` — create a file record
//!   - `GET    /files` — list files (supports user_id, type, published)
//!   - `GET    /files/deleted` — the caller's tombstones
//!   - `DELETE /files/{id}` — tombstone and remove a file
//!   - `POST   /files/{id}/restore` — reset a live file to unpublished
//!
//! - **Blob endpoints**
//!   - `PUT    /upload/{token}` — accept an upload against a ticket
//!   - `GET    /blobs/{id}` — fetch a payload via signed URL
//!
//! - **User endpoints**
//!   - `POST   /users/sync` — create/update the caller's account
//!   - `GET    /users/me` — resolve the caller
//!
//! - **Publication endpoints**
//!   - `POST   /publications` — create; `GET /publications` — list
//!   - `GET    /publications/{id}` — detail
//!   - `POST   /publications/{id}/publish` — flip the published flag
//!   - `POST   /publications/{id}/comments` — comment; `GET` — thread

use crate::{
    handlers::{
        blob_handlers::{accept_upload, fetch_blob},
        file_handlers::{
            create_file, delete_file, list_deleted_files, list_files, request_upload_url,
            restore_file,
        },
        health_handlers::{healthz, readyz},
        publication_handlers::{
            add_comment, create_publication, get_publication, list_comments, list_publications,
            set_publication_published,
        },
        user_handlers::{current_user, sync_user},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Build and return the router for the whole API surface.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // File-level routes
        .route("/files/upload-url", post(request_upload_url))
        .route("/files", post(create_file).get(list_files))
        .route("/files/deleted", get(list_deleted_files))
        .route("/files/{id}", delete(delete_file))
        .route("/files/{id}/restore", post(restore_file))
        // Blob transfer routes
        .route("/upload/{token}", put(accept_upload))
        .route("/blobs/{id}", get(fetch_blob))
        // User routes
        .route("/users/sync", post(sync_user))
        .route("/users/me", get(current_user))
        // Publication routes
        .route(
            "/publications",
            post(create_publication).get(list_publications),
        )
        .route("/publications/{id}", get(get_publication))
        .route("/publications/{id}/publish", post(set_publication_published))
        .route(
            "/publications/{id}/comments",
            post(add_comment).get(list_comments),
        )
}
