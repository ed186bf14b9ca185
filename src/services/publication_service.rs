//! Publication operations: create, list, publish, and comment threads.

use crate::{
    auth::Identity,
    models::{
        publication::{Publication, PublicationComment},
        user::User,
    },
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{VaultError, VaultResult, blob_store::BlobStore};

/// Request body for creating a publication.
#[derive(Debug, Deserialize)]
pub struct CreatePublicationParams {
    pub title: String,
    pub description: Option<String>,
    pub publication_date: Option<String>,
    #[serde(default)]
    pub file_ids: Vec<Uuid>,
    pub status: Option<String>,
    pub cover_blob_id: Option<Uuid>,
    #[serde(default)]
    pub is_published: bool,
}

/// Request body for flipping the published flag.
#[derive(Debug, Deserialize)]
pub struct SetPublishedParams {
    pub is_published: bool,
}

/// Request body for posting a comment.
#[derive(Debug, Deserialize)]
pub struct AddCommentParams {
    pub comment_text: String,
}

/// Listing filters, both optional and conjunctive.
#[derive(Clone, Debug)]
pub struct ListPublicationsParams {
    pub creator_id: Option<Uuid>,
    pub is_published: Option<bool>,
}

/// A publication with its ordered file references attached, plus a
/// signed cover URL when a cover blob is set.
#[derive(Serialize, Debug)]
pub struct PublicationWithFiles {
    #[serde(flatten)]
    pub publication: Publication,
    pub file_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

/// PublicationService owns the `publications` collection, the ordered
/// file-reference join table, and the comment thread per publication.
#[derive(Clone)]
pub struct PublicationService {
    db: Arc<SqlitePool>,
    blobs: BlobStore,
}

impl PublicationService {
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

    async fn fetch_publication(&self, publication_id: Uuid) -> VaultResult<Publication> {
        sqlx::query_as::<_, Publication>(
            "SELECT id, title, description, publication_date, creator_id, status,
                    cover_blob_id, is_published, created_at
             FROM publications WHERE id = ?",
        )
        .bind(publication_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => VaultError::PublicationNotFound(publication_id),
            other => VaultError::Sqlx(other),
        })
    }

    async fn file_ids(&self, publication_id: Uuid) -> VaultResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar(
            "SELECT file_id FROM publication_files
             WHERE publication_id = ? ORDER BY position ASC",
        )
        .bind(publication_id)
        .fetch_all(&*self.db)
        .await?)
    }

    async fn with_files(&self, publication: Publication) -> VaultResult<PublicationWithFiles> {
        let file_ids = self.file_ids(publication.id).await?;
        let cover_url = publication
            .cover_blob_id
            .as_ref()
            .map(|blob_id| self.blobs.signed_url(blob_id));
        Ok(PublicationWithFiles {
            publication,
            file_ids,
            cover_url,
        })
    }

    /// Create a publication over the caller's files.
    ///
    /// Every referenced file must exist and belong to the caller, and
    /// the cover blob (when given) must exist; any failure rejects the
    /// whole operation before the first write.
    pub async fn create(
        &self,
        identity: Option<&Identity>,
        params: CreatePublicationParams,
    ) -> VaultResult<PublicationWithFiles> {
        let Some(identity) = identity else {
            return Err(VaultError::Unauthenticated("create a publication"));
        };
        let creator = self.caller_by_token(&identity.token_identifier).await?;

        for file_id in &params.file_ids {
            let owner_id: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM files WHERE id = ?")
                .bind(file_id)
                .fetch_optional(&*self.db)
                .await?;
            match owner_id {
                None => return Err(VaultError::FileNotFound(*file_id)),
                Some(owner_id) if owner_id != creator.id => {
                    return Err(VaultError::PermissionDenied(
                        "attach files you do not own",
                    ));
                }
                Some(_) => {}
            }
        }
        if let Some(cover_blob_id) = &params.cover_blob_id {
            self.blobs.fetch_blob(cover_blob_id).await?;
        }

        let publication = Publication {
            id: Uuid::new_v4(),
            title: params.title,
            description: params.description,
            publication_date: params.publication_date,
            creator_id: creator.id,
            status: params.status,
            cover_blob_id: params.cover_blob_id,
            is_published: params.is_published,
            created_at: Utc::now(),
        };

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO publications (id, title, description, publication_date, creator_id,
                                       status, cover_blob_id, is_published, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(publication.id)
        .bind(&publication.title)
        .bind(&publication.description)
        .bind(&publication.publication_date)
        .bind(publication.creator_id)
        .bind(&publication.status)
        .bind(publication.cover_blob_id)
        .bind(publication.is_published)
        .bind(publication.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, file_id) in params.file_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO publication_files (publication_id, file_id, position)
                 VALUES (?, ?, ?)",
            )
            .bind(publication.id)
            .bind(file_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(
            "created publication {} with {} files for user {}",
            publication.id,
            params.file_ids.len(),
            creator.id
        );

        Ok(PublicationWithFiles {
            publication,
            file_ids: params.file_ids,
            cover_url: None,
        })
    }

    /// List publications, optionally filtered by creator and published
    /// flag, newest first.
    pub async fn list(
        &self,
        params: ListPublicationsParams,
    ) -> VaultResult<Vec<PublicationWithFiles>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, title, description, publication_date, creator_id, status, \
             cover_blob_id, is_published, created_at \
             FROM publications WHERE 1 = 1",
        );
        if let Some(creator_id) = params.creator_id {
            builder.push(" AND creator_id = ");
            builder.push_bind(creator_id);
        }
        if let Some(is_published) = params.is_published {
            builder.push(" AND is_published = ");
            builder.push_bind(is_published);
        }
        builder.push(" ORDER BY created_at DESC");

        let rows: Vec<Publication> = builder.build_query_as().fetch_all(&*self.db).await?;

        let mut publications = Vec::with_capacity(rows.len());
        for row in rows {
            publications.push(self.with_files(row).await?);
        }
        Ok(publications)
    }

    /// Fetch one publication with its file references and cover URL.
    pub async fn get(&self, publication_id: Uuid) -> VaultResult<PublicationWithFiles> {
        let publication = self.fetch_publication(publication_id).await?;
        self.with_files(publication).await
    }

    /// Flip the published flag; creator only.
    pub async fn set_published(
        &self,
        identity: Option<&Identity>,
        publication_id: Uuid,
        params: SetPublishedParams,
    ) -> VaultResult<Publication> {
        let publication = self.fetch_publication(publication_id).await?;
        let Some(identity) = identity else {
            return Err(VaultError::Unauthenticated("modify this publication"));
        };
        let caller = self.caller_by_token(&identity.token_identifier).await?;
        if publication.creator_id != caller.id {
            return Err(VaultError::PermissionDenied("modify this publication"));
        }

        Ok(sqlx::query_as::<_, Publication>(
            "UPDATE publications SET is_published = ? WHERE id = ?
             RETURNING id, title, description, publication_date, creator_id, status,
                       cover_blob_id, is_published, created_at",
        )
        .bind(params.is_published)
        .bind(publication_id)
        .fetch_one(&*self.db)
        .await?)
    }

    /// Post a comment on an existing publication.
    pub async fn add_comment(
        &self,
        identity: Option<&Identity>,
        publication_id: Uuid,
        params: AddCommentParams,
    ) -> VaultResult<PublicationComment> {
        let Some(identity) = identity else {
            return Err(VaultError::Unauthenticated("comment on a publication"));
        };
        let author = self.caller_by_token(&identity.token_identifier).await?;
        self.fetch_publication(publication_id).await?;

        Ok(sqlx::query_as::<_, PublicationComment>(
            "INSERT INTO publication_comments (id, publication_id, user_id, comment_text, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id, publication_id, user_id, comment_text, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(publication_id)
        .bind(author.id)
        .bind(&params.comment_text)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?)
    }

    /// The comment thread for a publication, oldest first.
    pub async fn comments(&self, publication_id: Uuid) -> VaultResult<Vec<PublicationComment>> {
        self.fetch_publication(publication_id).await?;

        Ok(sqlx::query_as::<_, PublicationComment>(
            "SELECT id, publication_id, user_id, comment_text, created_at
             FROM publication_comments
             WHERE publication_id = ? ORDER BY created_at ASC",
        )
        .bind(publication_id)
        .fetch_all(&*self.db)
        .await?)
    }
}
