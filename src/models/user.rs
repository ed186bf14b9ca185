//! Represents a registered user of the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user account, created on first authenticated sync.
///
/// Identity itself lives with the external provider; this record only
/// ties the provider's opaque token to an internal id and carries the
/// mutable profile fields.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct User {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Opaque token from the identity provider (unique, indexed).
    pub token_identifier: String,

    /// Display name, if the provider supplied one.
    pub name: Option<String>,

    /// Avatar reference (URL or blob id as issued by the provider).
    pub image: Option<String>,

    /// When this account was first seen.
    pub created_at: DateTime<Utc>,
}
