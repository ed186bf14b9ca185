//! File record operations: create, list, tombstone-delete, restore.

use crate::{
    auth::Identity,
    models::{
        file::{DeletedFile, FileRecord, FileType},
        user::User,
    },
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{VaultError, VaultResult, blob_store::BlobStore};

/// Request body for creating a file record.
#[derive(Debug, Deserialize)]
pub struct CreateFileParams {
    pub name: String,
    pub blob_id: Uuid,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub version: i64,
    pub is_published: bool,
    pub upload_date: String,
}

/// Listing parameters: the owner plus optional conjunctive filters.
#[derive(Clone, Debug)]
pub struct ListFilesParams {
    pub user_id: Uuid,
    pub file_type: Option<FileType>,
    pub is_published: Option<bool>,
}

/// A file record augmented with a time-limited access URL for its blob.
#[derive(Serialize, Debug)]
pub struct FileWithUrl {
    #[serde(flatten)]
    pub file: FileRecord,
    pub url: String,
}

/// FileService owns the live `files` collection and its tombstones.
///
/// Every operation that requires authentication resolves the caller's
/// bearer token to an internal user id via the token index and compares
/// that id against stored owner ids; no other identity attribute is
/// ever consulted.
#[derive(Clone)]
pub struct FileService {
    db: Arc<SqlitePool>,
    blobs: BlobStore,
}

impl FileService {
    pub fn new(db: Arc<SqlitePool>, blobs: BlobStore) -> Self {
        Self { db, blobs }
    }

    async fn caller_by_token(&self, token_identifier: &str) -> VaultResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, token_identifier, name, image, created_at
             FROM users WHERE token_identifier = ?",
        )
        .bind(token_identifier)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => VaultError::UserNotFound,
            other => VaultError::Sqlx(other),
        })
    }

    async fn fetch_file(&self, file_id: Uuid) -> VaultResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, name, file_type, user_id, blob_id, version, is_published, upload_date
             FROM files WHERE id = ?",
        )
        .bind(file_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => VaultError::FileNotFound(file_id),
            other => VaultError::Sqlx(other),
        })
    }

    /// Existence first, then ownership: a missing record is not-found
    /// even for callers who could never have owned it.
    async fn owned_file(
        &self,
        identity: Option<&Identity>,
        file_id: Uuid,
        action: &'static str,
    ) -> VaultResult<FileRecord> {
        let file = self.fetch_file(file_id).await?;
        let Some(identity) = identity else {
            return Err(VaultError::Unauthenticated(action));
        };
        let caller = self.caller_by_token(&identity.token_identifier).await?;
        if file.user_id != caller.id {
            return Err(VaultError::PermissionDenied(action));
        }
        Ok(file)
    }

    /// Insert one file record for the authenticated caller.
    ///
    /// The caller's token must resolve to a user and the referenced
    /// blob must exist; either failure rejects with no partial state.
    pub async fn create_file(
        &self,
        identity: Option<&Identity>,
        params: CreateFileParams,
    ) -> VaultResult<FileRecord> {
        let Some(identity) = identity else {
            return Err(VaultError::Unauthenticated("upload a file"));
        };
        let owner = self.caller_by_token(&identity.token_identifier).await?;
        self.blobs.fetch_blob(&params.blob_id).await?;

        let file = sqlx::query_as::<_, FileRecord>(
            "INSERT INTO files (id, name, file_type, user_id, blob_id, version, is_published, upload_date)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id, name, file_type, user_id, blob_id, version, is_published, upload_date",
        )
        .bind(Uuid::new_v4())
        .bind(&params.name)
        .bind(params.file_type)
        .bind(owner.id)
        .bind(params.blob_id)
        .bind(params.version)
        .bind(params.is_published)
        .bind(&params.upload_date)
        .fetch_one(&*self.db)
        .await?;

        debug!("created file {} for user {}", file.id, owner.id);
        Ok(file)
    }

    /// List a user's files, each augmented with a signed access URL.
    ///
    /// One indexed fetch by owner; the optional type and published
    /// filters are applied in memory afterwards and are conjunctive.
    /// The per-user result set is small, so the filters deliberately
    /// stay out of the SQL.
    pub async fn list_files(&self, params: ListFilesParams) -> VaultResult<Vec<FileWithUrl>> {
        let mut files: Vec<FileRecord> = sqlx::query_as(
            "SELECT id, name, file_type, user_id, blob_id, version, is_published, upload_date
             FROM files WHERE user_id = ?",
        )
        .bind(params.user_id)
        .fetch_all(&*self.db)
        .await?;

        if let Some(file_type) = params.file_type {
            files.retain(|file| file.file_type == file_type);
        }
        if let Some(is_published) = params.is_published {
            files.retain(|file| file.is_published == is_published);
        }

        Ok(files
            .into_iter()
            .map(|file| {
                let url = self.blobs.signed_url(&file.blob_id);
                FileWithUrl { file, url }
            })
            .collect())
    }

    /// Delete an owned file: write the tombstone, remove the live row.
    ///
    /// Both writes commit or fail together; there is no state in which
    /// the tombstone exists while the live row survives, or vice versa.
    pub async fn delete_file(
        &self,
        identity: Option<&Identity>,
        file_id: Uuid,
    ) -> VaultResult<DeletedFile> {
        let file = self.owned_file(identity, file_id, "delete this file").await?;

        let tombstone = DeletedFile {
            id: Uuid::new_v4(),
            name: file.name.clone(),
            user_id: file.user_id,
            blob_id: file.blob_id,
            deleted_at: Utc::now(),
        };

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO deleted_files (id, name, user_id, blob_id, deleted_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(tombstone.id)
        .bind(&tombstone.name)
        .bind(tombstone.user_id)
        .bind(tombstone.blob_id)
        .bind(tombstone.deleted_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(file.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("deleted file {} for user {}", file.id, file.user_id);
        Ok(tombstone)
    }

    /// Restore an owned file by resetting its published flag.
    ///
    /// Acts on the live collection only: once the delete path has
    /// removed an id, restoring it reports not-found rather than
    /// resurrecting the tombstone.
    pub async fn restore_file(
        &self,
        identity: Option<&Identity>,
        file_id: Uuid,
    ) -> VaultResult<FileRecord> {
        self.owned_file(identity, file_id, "restore this file").await?;

        let file = sqlx::query_as::<_, FileRecord>(
            "UPDATE files SET is_published = 0 WHERE id = ?
             RETURNING id, name, file_type, user_id, blob_id, version, is_published, upload_date",
        )
        .bind(file_id)
        .fetch_one(&*self.db)
        .await?;

        debug!("restored file {} to unpublished", file.id);
        Ok(file)
    }

    /// The caller's tombstones, newest first.
    pub async fn deleted_files(&self, identity: Option<&Identity>) -> VaultResult<Vec<DeletedFile>> {
        let Some(identity) = identity else {
            return Err(VaultError::Unauthenticated("list deleted files"));
        };
        let owner = self.caller_by_token(&identity.token_identifier).await?;

        Ok(sqlx::query_as::<_, DeletedFile>(
            "SELECT id, name, user_id, blob_id, deleted_at
             FROM deleted_files WHERE user_id = ? ORDER BY deleted_at DESC",
        )
        .bind(owner.id)
        .fetch_all(&*self.db)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{identity, memory_pool, seed_blob, seed_user};

    fn service(db: Arc<SqlitePool>) -> FileService {
        let dir = std::env::temp_dir().join(format!("filehub-test-{}", Uuid::new_v4()));
        let blobs = BlobStore::new(db.clone(), dir, "http://localhost:3000", "test-secret", 3600);
        FileService::new(db, blobs)
    }

    fn params(name: &str, blob_id: Uuid, file_type: FileType, published: bool) -> CreateFileParams {
        CreateFileParams {
            name: name.to_string(),
            blob_id,
            file_type,
            version: 1,
            is_published: published,
            upload_date: "2026-08-06".to_string(),
        }
    }

    async fn file_count(db: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(db)
            .await
            .unwrap()
    }

    async fn tombstone_count(db: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM deleted_files")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_without_identity_inserts_nothing() {
        let db = memory_pool().await;
        let files = service(db.clone());
        let blob_id = seed_blob(&db).await;

        let err = files
            .create_file(None, params("a.pdf", blob_id, FileType::Pdf, false))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Unauthenticated(_)));
        assert_eq!(file_count(&db).await, 0);
    }

    #[tokio::test]
    async fn create_with_unknown_token_inserts_nothing() {
        let db = memory_pool().await;
        let files = service(db.clone());
        let blob_id = seed_blob(&db).await;

        let err = files
            .create_file(
                Some(&identity("tok-ghost")),
                params("a.pdf", blob_id, FileType::Pdf, false),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::UserNotFound));
        assert_eq!(file_count(&db).await, 0);
    }

    #[tokio::test]
    async fn create_rejects_missing_blob() {
        let db = memory_pool().await;
        let files = service(db.clone());
        seed_user(&db, "tok-a").await;

        let err = files
            .create_file(
                Some(&identity("tok-a")),
                params("a.pdf", Uuid::new_v4(), FileType::Pdf, false),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::BlobNotFound(_)));
        assert_eq!(file_count(&db).await, 0);
    }

    #[tokio::test]
    async fn listing_scopes_to_owner_and_filters_conjunctively() {
        let db = memory_pool().await;
        let files = service(db.clone());
        let owner_id = seed_user(&db, "tok-a").await;
        seed_user(&db, "tok-b").await;
        let blob_id = seed_blob(&db).await;

        let caller_a = identity("tok-a");
        let caller_b = identity("tok-b");
        files
            .create_file(Some(&caller_a), params("report.pdf", blob_id, FileType::Pdf, true))
            .await
            .unwrap();
        files
            .create_file(Some(&caller_a), params("photo.png", blob_id, FileType::Image, false))
            .await
            .unwrap();
        files
            .create_file(Some(&caller_b), params("other.doc", blob_id, FileType::Doc, true))
            .await
            .unwrap();

        let all = files
            .list_files(ListFilesParams {
                user_id: owner_id,
                file_type: None,
                is_published: None,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|entry| entry.file.user_id == owner_id));
        assert!(all.iter().all(|entry| entry.url.contains(&blob_id.to_string())));

        let pdfs = files
            .list_files(ListFilesParams {
                user_id: owner_id,
                file_type: Some(FileType::Pdf),
                is_published: None,
            })
            .await
            .unwrap();
        assert_eq!(pdfs.len(), 1);
        assert_eq!(pdfs[0].file.name, "report.pdf");

        let published_pdfs = files
            .list_files(ListFilesParams {
                user_id: owner_id,
                file_type: Some(FileType::Pdf),
                is_published: Some(true),
            })
            .await
            .unwrap();
        assert_eq!(published_pdfs.len(), 1);

        let unpublished_pdfs = files
            .list_files(ListFilesParams {
                user_id: owner_id,
                file_type: Some(FileType::Pdf),
                is_published: Some(false),
            })
            .await
            .unwrap();
        assert!(unpublished_pdfs.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_file_mutates_nothing() {
        let db = memory_pool().await;
        let files = service(db.clone());
        seed_user(&db, "tok-a").await;

        let missing = Uuid::new_v4();
        let err = files
            .delete_file(Some(&identity("tok-a")), missing)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::FileNotFound(id) if id == missing));
        assert_eq!(file_count(&db).await, 0);
        assert_eq!(tombstone_count(&db).await, 0);
    }

    #[tokio::test]
    async fn delete_foreign_file_is_denied_and_mutates_nothing() {
        let db = memory_pool().await;
        let files = service(db.clone());
        seed_user(&db, "tok-a").await;
        seed_user(&db, "tok-b").await;
        let blob_id = seed_blob(&db).await;

        let file = files
            .create_file(
                Some(&identity("tok-a")),
                params("mine.pdf", blob_id, FileType::Pdf, false),
            )
            .await
            .unwrap();

        let err = files
            .delete_file(Some(&identity("tok-b")), file.id)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::PermissionDenied(_)));
        assert_eq!(file_count(&db).await, 1);
        assert_eq!(tombstone_count(&db).await, 0);
    }

    #[tokio::test]
    async fn delete_owned_file_leaves_one_tombstone_and_no_live_row() {
        let db = memory_pool().await;
        let files = service(db.clone());
        let owner_id = seed_user(&db, "tok-a").await;
        let blob_id = seed_blob(&db).await;
        let caller = identity("tok-a");

        let file = files
            .create_file(Some(&caller), params("mine.pdf", blob_id, FileType::Pdf, true))
            .await
            .unwrap();

        let tombstone = files.delete_file(Some(&caller), file.id).await.unwrap();
        assert_eq!(tombstone.name, "mine.pdf");
        assert_eq!(tombstone.user_id, owner_id);
        assert_eq!(tombstone.blob_id, blob_id);

        assert_eq!(file_count(&db).await, 0);
        assert_eq!(tombstone_count(&db).await, 1);

        let listed = files.deleted_files(Some(&caller)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, tombstone.id);

        // The id is gone, so restoration cannot reverse the deletion.
        let err = files.restore_file(Some(&caller), file.id).await.unwrap_err();
        assert!(matches!(err, VaultError::FileNotFound(id) if id == file.id));
    }

    #[tokio::test]
    async fn restore_unpublishes_live_file_and_changes_nothing_else() {
        let db = memory_pool().await;
        let files = service(db.clone());
        seed_user(&db, "tok-a").await;
        let blob_id = seed_blob(&db).await;
        let caller = identity("tok-a");

        let file = files
            .create_file(Some(&caller), params("live.docx", blob_id, FileType::Docx, true))
            .await
            .unwrap();
        assert!(file.is_published);

        let restored = files.restore_file(Some(&caller), file.id).await.unwrap();
        assert!(!restored.is_published);
        assert_eq!(restored.id, file.id);
        assert_eq!(restored.name, file.name);
        assert_eq!(restored.blob_id, file.blob_id);
        assert_eq!(restored.version, file.version);
        assert_eq!(restored.upload_date, file.upload_date);
    }

    #[tokio::test]
    async fn restore_checks_ownership_like_delete() {
        let db = memory_pool().await;
        let files = service(db.clone());
        seed_user(&db, "tok-a").await;
        seed_user(&db, "tok-b").await;
        let blob_id = seed_blob(&db).await;

        let file = files
            .create_file(
                Some(&identity("tok-a")),
                params("mine.ppt", blob_id, FileType::Ppt, true),
            )
            .await
            .unwrap();

        let err = files
            .restore_file(Some(&identity("tok-b")), file.id)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::PermissionDenied(_)));

        let err = files.restore_file(None, file.id).await.unwrap_err();
        assert!(matches!(err, VaultError::Unauthenticated(_)));
    }
}
