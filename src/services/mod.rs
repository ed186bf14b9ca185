//! Service layer: record-management operations over SQLite metadata and
//! on-disk blob payloads.
//!
//! Each service keeps a minimal surface so it is easy to test without a
//! running HTTP server; caller identity is always an explicit parameter
//! rather than ambient state.

use std::io;
use thiserror::Error;
use uuid::Uuid;

pub mod blob_store;
pub mod file_service;
pub mod publication_service;
pub mod user_service;

/// Operation failures surfaced to callers.
///
/// Two kinds dominate: missing identity for an operation that requires
/// one, and a referenced record that is absent or not owned by the
/// caller. Database and disk failures pass through transparently.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("you must be logged in to {0}")]
    Unauthenticated(&'static str),
    #[error("user not found")]
    UserNotFound,
    #[error("file `{0}` not found")]
    FileNotFound(Uuid),
    #[error("blob `{0}` not found")]
    BlobNotFound(Uuid),
    #[error("publication `{0}` not found")]
    PublicationNotFound(Uuid),
    #[error("upload ticket not found")]
    TicketNotFound,
    #[error("upload ticket has expired")]
    TicketExpired,
    #[error("upload ticket has already been used")]
    TicketUsed,
    #[error("you do not have permission to {0}")]
    PermissionDenied(&'static str),
    #[error("invalid or expired access url")]
    InvalidSignature,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::auth::Identity;
    use chrono::Utc;
    use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
    use std::sync::Arc;
    use uuid::Uuid;

    /// Fresh in-memory database with the full schema applied.
    ///
    /// A single connection is required: every pooled connection to
    /// `sqlite::memory:` would otherwise get its own empty database.
    pub async fn memory_pool() -> Arc<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");

        for stmt in include_str!("../../migrations/0001_init.sql")
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(stmt)
                .execute(&pool)
                .await
                .expect("migration statement");
        }

        Arc::new(pool)
    }

    pub fn identity(token: &str) -> Identity {
        Identity {
            token_identifier: token.to_string(),
        }
    }

    pub async fn seed_user(db: &SqlitePool, token: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, token_identifier, name, image, created_at)
             VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(id)
        .bind(token)
        .bind(format!("user-{token}"))
        .bind(Utc::now())
        .execute(db)
        .await
        .expect("seed user");
        id
    }

    pub async fn seed_blob(db: &SqlitePool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO blobs (id, etag, size_bytes, content_type, created_at)
             VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(id)
        .bind(format!("{:x}", md5::compute(id.as_bytes())))
        .bind(42_i64)
        .bind(Utc::now())
        .execute(db)
        .await
        .expect("seed blob");
        id
    }
}
