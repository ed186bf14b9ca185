//! User account sync and lookup.

use crate::{auth::Identity, models::user::User};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{VaultError, VaultResult};

/// Profile fields accepted by the sync operation.
#[derive(Debug, Deserialize)]
pub struct SyncUserParams {
    pub name: Option<String>,
    pub image: Option<String>,
}

/// UserService maps opaque identity-provider tokens to user records.
///
/// Accounts are created on first authenticated sync and only their
/// profile fields mutate afterwards.
#[derive(Clone)]
pub struct UserService {
    db: Arc<SqlitePool>,
}

impl UserService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Upsert the caller's account keyed on their token identifier.
    ///
    /// The first call creates the record; later calls only overwrite
    /// `name`/`image`, and only when a new value is supplied.
    pub async fn sync(
        &self,
        identity: Option<&Identity>,
        params: SyncUserParams,
    ) -> VaultResult<User> {
        let Some(identity) = identity else {
            return Err(VaultError::Unauthenticated("sync your profile"));
        };

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, token_identifier, name, image, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(token_identifier) DO UPDATE SET
                 name = COALESCE(excluded.name, users.name),
                 image = COALESCE(excluded.image, users.image)
             RETURNING id, token_identifier, name, image, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&identity.token_identifier)
        .bind(params.name)
        .bind(params.image)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;

        debug!("synced user {} ({})", user.id, user.token_identifier);
        Ok(user)
    }

    /// Resolve the caller's account via the token index.
    pub async fn current(&self, identity: Option<&Identity>) -> VaultResult<User> {
        let Some(identity) = identity else {
            return Err(VaultError::Unauthenticated("look up your profile"));
        };

        sqlx::query_as::<_, User>(
            "SELECT id, token_identifier, name, image, created_at
             FROM users WHERE token_identifier = ?",
        )
        .bind(&identity.token_identifier)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => VaultError::UserNotFound,
            other => VaultError::Sqlx(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{identity, memory_pool};

    #[tokio::test]
    async fn sync_creates_then_updates_profile_only() {
        let db = memory_pool().await;
        let service = UserService::new(db);
        let caller = identity("tok-sync");

        let created = service
            .sync(
                Some(&caller),
                SyncUserParams {
                    name: Some("Ada".into()),
                    image: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.token_identifier, "tok-sync");
        assert_eq!(created.name.as_deref(), Some("Ada"));
        assert!(created.image.is_none());

        let updated = service
            .sync(
                Some(&caller),
                SyncUserParams {
                    name: None,
                    image: Some("https://avatars.test/ada.png".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        // Absent fields keep their previous values.
        assert_eq!(updated.name.as_deref(), Some("Ada"));
        assert_eq!(
            updated.image.as_deref(),
            Some("https://avatars.test/ada.png")
        );
    }

    #[tokio::test]
    async fn current_requires_identity_and_existing_account() {
        let db = memory_pool().await;
        let service = UserService::new(db);

        let err = service.current(None).await.unwrap_err();
        assert!(matches!(err, VaultError::Unauthenticated(_)));

        let err = service
            .current(Some(&identity("tok-unknown")))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::UserNotFound));
    }
}
