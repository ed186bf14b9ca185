//! src/services/blob_store.rs
//!
//! BlobStore — blob payload storage backed by SQLite for metadata and
//! local disk for the bytes, sharded beneath `base_path/{aa}/{bb}/{id}`.
//! It also owns the two grants the platform hands out around a blob's
//! lifetime: one-time upload tickets and time-limited signed access
//! URLs.

use crate::{
    auth::Identity,
    models::{blob::Blob, upload::UploadTicket},
};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use serde::Serialize;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

use super::{VaultError, VaultResult};

/// Response payload for an issued upload ticket.
#[derive(Serialize, Debug)]
pub struct UploadGrant {
    pub upload_url: String,
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// BlobStore provides the storage-platform half of the service:
/// - Issue one-time upload tickets to authenticated callers
/// - Accept a streamed upload against a ticket (bytes to disk, metadata
///   to SQLite)
/// - Mint and verify signed, expiring access URLs
/// - Open a blob for streaming out
///
/// Record-level concerns (files, publications) live in the other
/// services; this struct never looks at ownership.
#[derive(Clone)]
pub struct BlobStore {
    /// Shared SQLite connection pool used for metadata operations.
    db: Arc<SqlitePool>,

    /// Base directory on disk where blob payloads are stored.
    pub base_path: PathBuf,

    /// External base URL used when minting upload and access URLs.
    public_url: String,

    /// Secret mixed into access-URL signatures.
    url_secret: String,

    /// Lifetime of upload tickets and access URLs.
    url_ttl: Duration,
}

impl BlobStore {
    pub fn new(
        db: Arc<SqlitePool>,
        base_path: impl Into<PathBuf>,
        public_url: impl Into<String>,
        url_secret: impl Into<String>,
        url_ttl_secs: u64,
    ) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
            url_secret: url_secret.into(),
            url_ttl: Duration::seconds(url_ttl_secs as i64),
        }
    }

    /// Generate two-level shard identifiers for a blob id.
    ///
    /// Uses the first two hex byte-pairs of the id's simple form.
    /// Reduces file count per directory.
    fn blob_shards(blob_id: &Uuid) -> (String, String) {
        let hex = blob_id.simple().to_string();
        (hex[..2].to_string(), hex[2..4].to_string())
    }

    /// Construct the fully-qualified payload path for a blob.
    ///
    /// Parent directories may not exist yet.
    fn blob_path(&self, blob_id: &Uuid) -> PathBuf {
        let (shard_a, shard_b) = Self::blob_shards(blob_id);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(blob_id.simple().to_string());
        path
    }

    /// Issue a short-lived, one-time upload ticket.
    ///
    /// The only precondition is an authenticated identity; the token in
    /// the returned URL is the credential for the upload itself.
    pub async fn issue_upload_ticket(
        &self,
        identity: Option<&Identity>,
    ) -> VaultResult<UploadGrant> {
        let Some(identity) = identity else {
            return Err(VaultError::Unauthenticated("upload a file"));
        };

        let ticket = UploadTicket {
            id: Uuid::new_v4(),
            token: Uuid::new_v4(),
            issued_to: identity.token_identifier.clone(),
            expires_at: Utc::now() + self.url_ttl,
            used_at: None,
        };

        sqlx::query(
            "INSERT INTO upload_tickets (id, token, issued_to, expires_at, used_at)
             VALUES (?, ?, ?, ?, NULL)",
        )
        .bind(ticket.id)
        .bind(ticket.token)
        .bind(&ticket.issued_to)
        .bind(ticket.expires_at)
        .execute(&*self.db)
        .await?;

        debug!("issued upload ticket {} to {}", ticket.token, ticket.issued_to);

        Ok(UploadGrant {
            upload_url: format!("{}/upload/{}", self.public_url, ticket.token),
            token: ticket.token,
            expires_at: ticket.expires_at,
        })
    }

    /// Stream-accept an upload against a ticket.
    ///
    /// - Validates the ticket (known, unused, unexpired).
    /// - Writes bytes incrementally to a temporary file, computing
    ///   MD5/etag and size while streaming.
    /// - Renames into the final sharded location after fsync.
    /// - Consumes the ticket and inserts the blob row in one
    ///   transaction.
    ///
    /// Failures clean up the temp file and leave no blob row behind.
    pub async fn accept_upload<S>(
        &self,
        token: Uuid,
        content_type: Option<String>,
        stream: S,
    ) -> VaultResult<Blob>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let ticket: UploadTicket = sqlx::query_as(
            "SELECT id, token, issued_to, expires_at, used_at
             FROM upload_tickets WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => VaultError::TicketNotFound,
            other => VaultError::Sqlx(other),
        })?;

        if ticket.used_at.is_some() {
            return Err(VaultError::TicketUsed);
        }
        if ticket.expires_at < Utc::now() {
            return Err(VaultError::TicketExpired);
        }

        let blob_id = Uuid::new_v4();
        let file_path = self.blob_path(&blob_id);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            VaultError::Io(io::Error::new(
                ErrorKind::Other,
                "blob path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(VaultError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(VaultError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(VaultError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(VaultError::Io(err));
        }

        // Fresh UUID path, so a plain rename cannot collide.
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(VaultError::Io(err));
        }

        let etag = format!("{:x}", digest.compute());
        let created_at = Utc::now();

        let mut tx = match self.db.begin().await {
            Ok(tx) => tx,
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                return Err(VaultError::Sqlx(err));
            }
        };

        let consumed =
            sqlx::query("UPDATE upload_tickets SET used_at = ? WHERE id = ? AND used_at IS NULL")
                .bind(created_at)
                .bind(ticket.id)
                .execute(&mut *tx)
                .await;
        match consumed {
            Ok(result) if result.rows_affected() == 0 => {
                // Lost a race against a concurrent upload on the same ticket.
                let _ = fs::remove_file(&file_path).await;
                return Err(VaultError::TicketUsed);
            }
            Ok(_) => {}
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                return Err(VaultError::Sqlx(err));
            }
        }

        let insert_result = sqlx::query_as::<_, Blob>(
            "INSERT INTO blobs (id, etag, size_bytes, content_type, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id, etag, size_bytes, content_type, created_at",
        )
        .bind(blob_id)
        .bind(&etag)
        .bind(size_bytes)
        .bind(content_type.clone())
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await;

        let blob = match insert_result {
            Ok(blob) => blob,
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                return Err(VaultError::Sqlx(err));
            }
        };

        if let Err(err) = tx.commit().await {
            let _ = fs::remove_file(&file_path).await;
            return Err(VaultError::Sqlx(err));
        }

        debug!(
            "stored blob {} ({} bytes) via ticket {}",
            blob.id, blob.size_bytes, ticket.token
        );

        Ok(blob)
    }

    /// Mint a time-limited access URL for a blob.
    ///
    /// The URL carries its own expiry and an opaque signature; no state
    /// is kept server-side.
    pub fn signed_url(&self, blob_id: &Uuid) -> String {
        let expires = (Utc::now() + self.url_ttl).timestamp();
        let sig = self.access_signature(blob_id, expires);
        format!(
            "{}/blobs/{}?expires={}&sig={}",
            self.public_url, blob_id, expires, sig
        )
    }

    /// Verify the expiry and signature of an access URL.
    pub fn verify_access(&self, blob_id: &Uuid, expires: i64, sig: &str) -> VaultResult<()> {
        if expires < Utc::now().timestamp() {
            return Err(VaultError::InvalidSignature);
        }
        if self.access_signature(blob_id, expires) != sig {
            return Err(VaultError::InvalidSignature);
        }
        Ok(())
    }

    fn access_signature(&self, blob_id: &Uuid, expires: i64) -> String {
        let digest = md5::compute(format!(
            "{}:{}:{}",
            self.url_secret,
            blob_id.simple(),
            expires
        ));
        general_purpose::URL_SAFE_NO_PAD.encode(digest.0)
    }

    /// Fetch blob metadata.
    ///
    /// Returns BlobNotFound if the record is missing.
    pub async fn fetch_blob(&self, blob_id: &Uuid) -> VaultResult<Blob> {
        sqlx::query_as::<_, Blob>(
            "SELECT id, etag, size_bytes, content_type, created_at FROM blobs WHERE id = ?",
        )
        .bind(blob_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => VaultError::BlobNotFound(*blob_id),
            other => VaultError::Sqlx(other),
        })
    }

    /// Fetch a blob for reading.
    ///
    /// Returns metadata and an opened File handle ready for streaming
    /// out. Reports BlobNotFound if the metadata exists but the
    /// physical payload is missing.
    pub async fn open_blob(&self, blob_id: &Uuid) -> VaultResult<(Blob, File)> {
        let blob = self.fetch_blob(blob_id).await?;

        let path = self.blob_path(blob_id);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                VaultError::BlobNotFound(*blob_id)
            } else {
                VaultError::Io(err)
            }
        })?;

        Ok((blob, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{identity, memory_pool};
    use futures::stream;
    use tokio::io::AsyncReadExt;

    fn temp_store(db: Arc<SqlitePool>) -> BlobStore {
        let dir = std::env::temp_dir().join(format!("filehub-test-{}", Uuid::new_v4()));
        BlobStore::new(db, dir, "http://localhost:3000", "test-secret", 3600)
    }

    fn body(bytes: &'static [u8]) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        stream::iter(vec![Ok(Bytes::from_static(bytes))])
    }

    #[tokio::test]
    async fn ticket_requires_identity() {
        let db = memory_pool().await;
        let store = temp_store(db);

        let err = store.issue_upload_ticket(None).await.unwrap_err();
        assert!(matches!(err, VaultError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn upload_roundtrip_and_one_time_ticket() {
        let db = memory_pool().await;
        let store = temp_store(db.clone());
        let caller = identity("tok-uploader");

        let grant = store.issue_upload_ticket(Some(&caller)).await.unwrap();
        assert!(grant.upload_url.ends_with(&format!("/upload/{}", grant.token)));

        let blob = store
            .accept_upload(grant.token, Some("text/plain".into()), body(b"hello world"))
            .await
            .unwrap();
        assert_eq!(blob.size_bytes, 11);
        assert_eq!(blob.etag, format!("{:x}", md5::compute(b"hello world")));
        assert_eq!(blob.content_type.as_deref(), Some("text/plain"));

        let (meta, mut file) = store.open_blob(&blob.id).await.unwrap();
        assert_eq!(meta.etag, blob.etag);
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"hello world");

        // The ticket is spent now.
        let err = store
            .accept_upload(grant.token, None, body(b"again"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::TicketUsed));

        let _ = std::fs::remove_dir_all(&store.base_path);
    }

    #[tokio::test]
    async fn expired_or_unknown_tickets_are_rejected() {
        let db = memory_pool().await;
        let store = temp_store(db.clone());
        let caller = identity("tok-expired");

        let err = store
            .accept_upload(Uuid::new_v4(), None, body(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::TicketNotFound));

        let grant = store.issue_upload_ticket(Some(&caller)).await.unwrap();
        sqlx::query("UPDATE upload_tickets SET expires_at = ? WHERE token = ?")
            .bind(Utc::now() - Duration::seconds(60))
            .bind(grant.token)
            .execute(&*db)
            .await
            .unwrap();

        let err = store
            .accept_upload(grant.token, None, body(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::TicketExpired));

        let _ = std::fs::remove_dir_all(&store.base_path);
    }

    #[tokio::test]
    async fn signed_urls_verify_and_reject_tampering() {
        let db = memory_pool().await;
        let store = temp_store(db);
        let blob_id = Uuid::new_v4();

        let url = store.signed_url(&blob_id);
        let query = url.split_once('?').unwrap().1;
        let mut expires = 0_i64;
        let mut sig = String::new();
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap();
            match key {
                "expires" => expires = value.parse().unwrap(),
                "sig" => sig = value.to_string(),
                other => panic!("unexpected query key {other}"),
            }
        }

        store.verify_access(&blob_id, expires, &sig).unwrap();

        let err = store.verify_access(&blob_id, expires, "bogus").unwrap_err();
        assert!(matches!(err, VaultError::InvalidSignature));

        // Expiry is checked before the signature, so any past timestamp fails.
        let past = Utc::now().timestamp() - 10;
        let err = store.verify_access(&blob_id, past, &sig).unwrap_err();
        assert!(matches!(err, VaultError::InvalidSignature));

        // A different blob id cannot reuse the signature.
        let err = store
            .verify_access(&Uuid::new_v4(), expires, &sig)
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidSignature));
    }

    #[tokio::test]
    async fn open_blob_reports_missing_records() {
        let db = memory_pool().await;
        let store = temp_store(db);

        let missing = Uuid::new_v4();
        let err = store.open_blob(&missing).await.unwrap_err();
        assert!(matches!(err, VaultError::BlobNotFound(id) if id == missing));
    }
}
