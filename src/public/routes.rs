use axum::{routing::get, Router};
use std::sync::Arc;

use crate::storage::Storage;

use super::handlers::{health_check, public_page, PublicState};

pub fn create_public_router(storage: Arc<dyn Storage>) -> Router {
    let state = Arc::new(PublicState { storage });

    Router::new()
        .route("/", get(health_check))
        .route("/u/{username}", get(public_page))
        .with_state(state)
}
