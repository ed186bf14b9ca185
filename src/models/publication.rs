//! Represents a publication and its comment thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A publication: an ordered collection of a user's files under a title.
///
/// The ordered file references live in the `publication_files` join
/// table and are attached by the service layer when responding.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Publication {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Title shown to readers.
    pub title: String,

    /// Optional longer description.
    pub description: Option<String>,

    /// Optional caller-supplied publication date, stored verbatim.
    pub publication_date: Option<String>,

    /// User who created the publication.
    pub creator_id: Uuid,

    /// Optional free-form status string.
    pub status: Option<String>,

    /// Optional cover image payload reference.
    pub cover_blob_id: Option<Uuid>,

    /// Whether the publication is visible.
    pub is_published: bool,

    /// When this record was created.
    pub created_at: DateTime<Utc>,
}

/// A single comment on a publication.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct PublicationComment {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Publication this comment belongs to (indexed).
    pub publication_id: Uuid,

    /// Comment author.
    pub user_id: Uuid,

    /// Comment body.
    pub comment_text: String,

    /// When the comment was posted.
    pub created_at: DateTime<Utc>,
}
