use axum::{
    middleware,
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth::{auth_middleware, AuthService};
use crate::storage::Storage;

use super::handlers::{
    create_link, delete_link, get_profile, get_session, health_check, list_links, put_profile,
    update_link, AppState,
};

pub fn create_api_router(storage: Arc<dyn Storage>, auth_service: Arc<AuthService>) -> Router {
    let state = Arc::new(AppState { storage });

    let protected_routes = Router::new()
        .route("/api/session", get(get_session))
        .route("/api/links", get(list_links).post(create_link))
        .route("/api/links/{id}", patch(update_link).delete(delete_link))
        .route("/api/profile", get(get_profile).put(put_profile))
        .route_layer(middleware::from_fn_with_state(auth_service, auth_middleware))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
}
