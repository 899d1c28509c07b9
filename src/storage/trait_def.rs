use crate::models::{Link, LinkChanges, LinkId, NewLink, Profile};
use crate::validation::ProfileDraft;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("conflicting record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => StorageError::Other(other.into()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent store for links and profiles.
///
/// Every link operation is scoped to an owner; a link id belonging to another
/// owner behaves exactly like a missing one.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, indexes)
    async fn init(&self) -> Result<()>;

    /// All links of an owner, `display_order` ascending with unordered rows last
    async fn list_links(&self, owner_id: &str) -> StorageResult<Vec<Link>>;

    /// Links shown on the public page
    async fn list_active_links(&self, owner_id: &str) -> StorageResult<Vec<Link>>;

    async fn create_link(&self, owner_id: &str, link: &NewLink) -> StorageResult<Link>;

    async fn update_link(
        &self,
        owner_id: &str,
        id: LinkId,
        changes: &LinkChanges,
    ) -> StorageResult<Link>;

    async fn delete_link(&self, owner_id: &str, id: LinkId) -> StorageResult<()>;

    /// Rewrite `display_order` to 0..n-1 in listing order.
    /// Returns how many rows changed.
    async fn normalize_order(&self, owner_id: &str) -> StorageResult<u64> {
        let links = self.list_links(owner_id).await?;
        let mut changed = 0;
        for (index, link) in links.iter().enumerate() {
            let index = index as i64;
            if link.display_order != Some(index) {
                self.update_link(owner_id, link.id, &LinkChanges::order(index))
                    .await?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn get_profile(&self, owner_id: &str) -> StorageResult<Option<Profile>>;

    async fn get_profile_by_username(&self, username: &str) -> StorageResult<Option<Profile>>;

    /// Create or replace the owner's profile. Fails with `Conflict` when the
    /// username belongs to someone else.
    async fn upsert_profile(&self, owner_id: &str, draft: &ProfileDraft)
        -> StorageResult<Profile>;
}

pub(crate) fn unix_now() -> Result<i64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs() as i64)
}
