//! Represents a one-time upload ticket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A short-lived, one-time write grant for blob storage.
///
/// The `token` appears in the upload URL handed to the client; the
/// ticket is consumed by setting `used_at` the first time bytes are
/// accepted against it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct UploadTicket {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Token embedded in the upload URL (unique, indexed).
    pub token: Uuid,

    /// Token identifier of the user the ticket was issued to.
    pub issued_to: String,

    /// Ticket validity deadline.
    pub expires_at: DateTime<Utc>,

    /// Set once the ticket has accepted an upload.
    pub used_at: Option<DateTime<Utc>>,
}
