use thiserror::Error;

use crate::remote::{AuthenticationError, RemoteError};
use crate::reorder::StaleOrderingError;

/// Error surfaced to the editor by the link collection and the mutation
/// coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// No signed-in owner; the caller should send the user to sign-in.
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// The drag referred to a link that is no longer held; reload first.
    #[error(transparent)]
    StaleOrdering(#[from] StaleOrderingError),
    /// One of the per-link index writes of a reorder failed. Writes before it
    /// landed, the rest were not issued.
    #[error("failed to save order ({written} of {total} positions written): {source}")]
    ReorderPersist {
        written: usize,
        total: usize,
        #[source]
        source: RemoteError,
    },
}

impl LinkError {
    /// Whether the user has to sign in again before retrying.
    pub fn is_authentication(&self) -> bool {
        matches!(self, LinkError::Authentication(_))
    }
}

pub type LinkResult<T> = Result<T, LinkError>;
