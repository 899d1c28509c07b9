use crate::models::{Link, LinkChanges, LinkId, NewLink, Profile};
use crate::storage::{Storage, StorageResult};
use crate::validation::ProfileDraft;
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Read cache in front of the public page lookups.
///
/// Only `get_profile_by_username` and `list_active_links` are cached; the
/// editor's own reads always go to the underlying store. Writes invalidate the
/// entries of the owner they touch.
pub struct CachedStorage {
    /// Underlying storage implementation
    inner: Arc<dyn Storage>,
    /// Profiles keyed by username (negative lookups included)
    profile_cache: Cache<String, Option<Profile>>,
    /// Active links keyed by owner id
    active_links_cache: Cache<String, Vec<Link>>,
}

impl CachedStorage {
    pub fn new(inner: Arc<dyn Storage>, max_cache_entries: u64, ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);

        let profile_cache = Cache::builder()
            .max_capacity(max_cache_entries)
            .time_to_live(ttl)
            .build();

        let active_links_cache = Cache::builder()
            .max_capacity(max_cache_entries)
            .time_to_live(ttl)
            .build();

        Self {
            inner,
            profile_cache,
            active_links_cache,
        }
    }

    async fn invalidate_links(&self, owner_id: &str) {
        self.active_links_cache.invalidate(owner_id).await;
    }
}

#[async_trait]
impl Storage for CachedStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn list_links(&self, owner_id: &str) -> StorageResult<Vec<Link>> {
        self.inner.list_links(owner_id).await
    }

    async fn list_active_links(&self, owner_id: &str) -> StorageResult<Vec<Link>> {
        if let Some(cached) = self.active_links_cache.get(owner_id).await {
            return Ok(cached);
        }

        let links = self.inner.list_active_links(owner_id).await?;
        self.active_links_cache
            .insert(owner_id.to_string(), links.clone())
            .await;

        Ok(links)
    }

    async fn create_link(&self, owner_id: &str, link: &NewLink) -> StorageResult<Link> {
        let result = self.inner.create_link(owner_id, link).await;
        self.invalidate_links(owner_id).await;
        result
    }

    async fn update_link(
        &self,
        owner_id: &str,
        id: LinkId,
        changes: &LinkChanges,
    ) -> StorageResult<Link> {
        let result = self.inner.update_link(owner_id, id, changes).await;
        self.invalidate_links(owner_id).await;
        result
    }

    async fn delete_link(&self, owner_id: &str, id: LinkId) -> StorageResult<()> {
        let result = self.inner.delete_link(owner_id, id).await;
        self.invalidate_links(owner_id).await;
        result
    }

    async fn normalize_order(&self, owner_id: &str) -> StorageResult<u64> {
        let result = self.inner.normalize_order(owner_id).await;
        self.invalidate_links(owner_id).await;
        result
    }

    async fn get_profile(&self, owner_id: &str) -> StorageResult<Option<Profile>> {
        self.inner.get_profile(owner_id).await
    }

    async fn get_profile_by_username(&self, username: &str) -> StorageResult<Option<Profile>> {
        if let Some(cached) = self.profile_cache.get(username).await {
            return Ok(cached);
        }

        let profile = self.inner.get_profile_by_username(username).await?;
        self.profile_cache
            .insert(username.to_string(), profile.clone())
            .await;

        Ok(profile)
    }

    async fn upsert_profile(
        &self,
        owner_id: &str,
        draft: &ProfileDraft,
    ) -> StorageResult<Profile> {
        let previous = self.inner.get_profile(owner_id).await?;
        let profile = self.inner.upsert_profile(owner_id, draft).await?;

        // A rename frees the old username, so both entries go.
        if let Some(previous) = previous {
            self.profile_cache.invalidate(&previous.username).await;
        }
        self.profile_cache.invalidate(&profile.username).await;

        Ok(profile)
    }
}
