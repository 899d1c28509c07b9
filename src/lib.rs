pub mod api;
pub mod auth;
pub mod collection;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod notify;
pub mod public;
pub mod remote;
pub mod reorder;
pub mod storage;
pub mod validation;

pub use collection::LinkCollection;
pub use coordinator::{MutationCoordinator, MutationPhase, Submitted};
pub use error::{LinkError, LinkResult};
