//! Represents a stored binary payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for one stored blob.
///
/// The payload itself lives on disk, sharded beneath the storage
/// directory; records reference it by `id` only.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Blob {
    /// Internal UUID, also the disk address of the payload.
    pub id: Uuid,

    /// MD5 checksum of the payload, hex-encoded.
    pub etag: String,

    /// Payload size in bytes.
    pub size_bytes: i64,

    /// Content type supplied at upload time.
    pub content_type: Option<String>,

    /// When the payload was stored.
    pub created_at: DateTime<Utc>,
}
