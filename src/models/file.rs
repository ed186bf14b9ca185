//! Represents a file record and the tombstone left by its deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The fixed set of document types a file record may carry.
#[derive(Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Pdf,
    Ppt,
    Pptx,
    Doc,
    Docx,
    Xlsx,
}

/// A live file record owned by a user.
///
/// The record stores metadata only; the payload lives in blob storage
/// under `blob_id`. Deleting a file removes this row entirely and
/// writes a [`DeletedFile`] tombstone.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct FileRecord {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Display name of the file.
    pub name: String,

    /// Document type.
    pub file_type: FileType,

    /// Owning user (indexed).
    pub user_id: Uuid,

    /// Reference to the stored payload.
    pub blob_id: Uuid,

    /// Caller-managed version number.
    pub version: i64,

    /// Whether the file is published.
    pub is_published: bool,

    /// Caller-supplied upload date, stored verbatim.
    pub upload_date: String,
}

/// Tombstone written when a file is deleted.
///
/// Carries a fresh id rather than the original file id; the live row is
/// gone once the tombstone exists.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct DeletedFile {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Display name at deletion time.
    pub name: String,

    /// User who owned the file (indexed).
    pub user_id: Uuid,

    /// Payload reference, kept so the blob remains addressable.
    pub blob_id: Uuid,

    /// When the deletion happened.
    pub deleted_at: DateTime<Utc>,
}
