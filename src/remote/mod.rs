//! The data client the editor core talks to.
//!
//! [`RemoteClient`] is the whole contract: list, create, update and delete
//! links of the signed-in owner, and resolve who that owner is. The core
//! never reaches the store any other way.

pub mod http;
pub mod store;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Link, LinkChanges, LinkId};

pub use http::HttpClient;
pub use store::{Session, StoreClient};

/// Failure reported by the data client. Timeouts are transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not signed in")]
pub struct AuthenticationError;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Owner of the current session.
    async fn current_owner_id(&self) -> Result<String, AuthenticationError>;

    /// All links of `owner_id` ordered by `display_order` ascending.
    async fn list_links(&self, owner_id: &str) -> RemoteResult<Vec<Link>>;

    async fn create_link(
        &self,
        owner_id: &str,
        title: &str,
        url: &str,
        display_order: i64,
    ) -> RemoteResult<Link>;

    async fn update_link(&self, id: LinkId, changes: &LinkChanges) -> RemoteResult<()>;

    async fn delete_link(&self, id: LinkId) -> RemoteResult<()>;
}
