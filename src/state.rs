//! Shared application state handed to every handler.

use crate::{
    config::AppConfig,
    services::{
        blob_store::BlobStore, file_service::FileService,
        publication_service::PublicationService, user_service::UserService,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// One clone of this lands in each handler via `axum::extract::State`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub blobs: BlobStore,
    pub users: UserService,
    pub files: FileService,
    pub publications: PublicationService,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, cfg: &AppConfig) -> Self {
        let blobs = BlobStore::new(
            db.clone(),
            cfg.storage_dir.clone(),
            cfg.public_url.clone(),
            cfg.url_secret.clone(),
            cfg.url_ttl_secs,
        );
        Self {
            users: UserService::new(db.clone()),
            files: FileService::new(db.clone(), blobs.clone()),
            publications: PublicationService::new(db.clone(), blobs.clone()),
            blobs,
            db,
        }
    }
}
