use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{AuthenticationError, RemoteClient, RemoteError, RemoteResult};
use crate::models::{Link, LinkChanges, LinkId, NewLink};
use crate::storage::{Storage, StorageError};

/// Who is signed in. Passed explicitly to the client instead of living in a
/// global.
#[derive(Debug, Default)]
pub struct Session {
    owner_id: RwLock<Option<String>>,
}

impl Session {
    pub fn signed_in(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: RwLock::new(Some(owner_id.into())),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub async fn sign_in(&self, owner_id: impl Into<String>) {
        *self.owner_id.write().await = Some(owner_id.into());
    }

    pub async fn sign_out(&self) {
        *self.owner_id.write().await = None;
    }

    pub async fn owner_id(&self) -> Option<String> {
        self.owner_id.read().await.clone()
    }
}

/// In-process client that talks to a [`Storage`] directly on behalf of the
/// session's owner.
pub struct StoreClient {
    storage: Arc<dyn Storage>,
    session: Arc<Session>,
}

impl StoreClient {
    pub fn new(storage: Arc<dyn Storage>, session: Arc<Session>) -> Self {
        Self { storage, session }
    }

    async fn owner(&self) -> RemoteResult<String> {
        self.session
            .owner_id()
            .await
            .ok_or_else(|| RemoteError::Transport("session has no owner".to_string()))
    }
}

impl From<StorageError> for RemoteError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => RemoteError::NotFound,
            StorageError::Conflict => {
                RemoteError::Conflict("conflicting record already exists".to_string())
            }
            StorageError::Other(e) => RemoteError::Transport(format!("{e:#}")),
        }
    }
}

#[async_trait]
impl RemoteClient for StoreClient {
    async fn current_owner_id(&self) -> Result<String, AuthenticationError> {
        self.session.owner_id().await.ok_or(AuthenticationError)
    }

    async fn list_links(&self, owner_id: &str) -> RemoteResult<Vec<Link>> {
        Ok(self.storage.list_links(owner_id).await?)
    }

    async fn create_link(
        &self,
        owner_id: &str,
        title: &str,
        url: &str,
        display_order: i64,
    ) -> RemoteResult<Link> {
        let link = NewLink {
            title: title.to_string(),
            url: url.to_string(),
            display_order: Some(display_order),
        };
        Ok(self.storage.create_link(owner_id, &link).await?)
    }

    async fn update_link(&self, id: LinkId, changes: &LinkChanges) -> RemoteResult<()> {
        let owner = self.owner().await?;
        self.storage.update_link(&owner, id, changes).await?;
        Ok(())
    }

    async fn delete_link(&self, id: LinkId) -> RemoteResult<()> {
        let owner = self.owner().await?;
        Ok(self.storage.delete_link(&owner, id).await?)
    }
}
