use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::handlers::{storage_error, ApiError, ErrorResponse, SuccessResponse};
use crate::models::PublicPage;
use crate::storage::Storage;

pub struct PublicState {
    pub storage: Arc<dyn Storage>,
}

/// Profile and active links for a username
pub async fn public_page(
    State(state): State<Arc<PublicState>>,
    Path(username): Path<String>,
) -> Result<Json<PublicPage>, ApiError> {
    let profile = state
        .storage
        .get_profile_by_username(&username)
        .await
        .map_err(|e| storage_error("load public page", e))?;

    let Some(profile) = profile else {
        tracing::debug!(username = %username, "no profile for username");
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Page not found".to_string(),
            }),
        ));
    };

    let links = state
        .storage
        .list_active_links(&profile.owner_id)
        .await
        .map_err(|e| storage_error("load public page", e))?;

    Ok(Json(PublicPage { profile, links }))
}

pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
