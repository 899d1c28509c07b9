use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::AuthenticatedOwner;
use crate::models::{Link, LinkChanges, LinkId, NewLink, Profile};
use crate::storage::{Storage, StorageError};
use crate::validation::{normalize_url, LinkDraft, ProfileDraft, ProfileForm, ValidationError};

pub struct AppState {
    pub storage: Arc<dyn Storage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub owner_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Appended after the last link when absent
    #[serde(default)]
    pub display_order: Option<i64>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn bad_request(err: ValidationError) -> ApiError {
    error(StatusCode::BAD_REQUEST, err.to_string())
}

pub(crate) fn storage_error(action: &str, err: StorageError) -> ApiError {
    match err {
        StorageError::NotFound => error(StatusCode::NOT_FOUND, "Link not found"),
        StorageError::Conflict => error(StatusCode::CONFLICT, "Conflicting record"),
        StorageError::Other(e) => {
            tracing::error!("failed to {action}: {e:#}");
            error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {action}"),
            )
        }
    }
}

fn check_order(display_order: Option<i64>) -> Result<(), ApiError> {
    match display_order {
        Some(order) if order < 0 => Err(error(
            StatusCode::BAD_REQUEST,
            "display_order must not be negative",
        )),
        _ => Ok(()),
    }
}

/// Owner of the bearer token
pub async fn get_session(
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
) -> Json<SessionResponse> {
    Json(SessionResponse { owner_id })
}

/// List the owner's links in display order
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
) -> Result<Json<Vec<Link>>, ApiError> {
    state
        .storage
        .list_links(&owner_id)
        .await
        .map(Json)
        .map_err(|e| storage_error("list links", e))
}

/// Create a link
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<Link>), ApiError> {
    let draft = LinkDraft::new(&payload.url, payload.title.as_deref()).map_err(bad_request)?;
    check_order(payload.display_order)?;

    let display_order = match payload.display_order {
        Some(order) => order,
        None => state
            .storage
            .list_links(&owner_id)
            .await
            .map_err(|e| storage_error("create link", e))?
            .len() as i64,
    };

    let new_link: NewLink = draft.into_new_link(display_order);
    let link = state
        .storage
        .create_link(&owner_id, &new_link)
        .await
        .map_err(|e| storage_error("create link", e))?;

    tracing::info!(owner_id = %owner_id, link_id = link.id, "link created");
    Ok((StatusCode::CREATED, Json(link)))
}

/// Update some fields of a link
pub async fn update_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
    Path(id): Path<LinkId>,
    Json(mut changes): Json<LinkChanges>,
) -> Result<Json<Link>, ApiError> {
    if changes.is_empty() {
        return Err(bad_request(ValidationError::EmptyPatch));
    }
    if let Some(title) = changes.title.as_mut() {
        *title = title.trim().to_string();
        if title.is_empty() {
            return Err(bad_request(ValidationError::EmptyTitle));
        }
    }
    if let Some(url) = changes.url.as_deref() {
        changes.url = Some(normalize_url(url).map_err(bad_request)?);
    }
    check_order(changes.display_order)?;

    state
        .storage
        .update_link(&owner_id, id, &changes)
        .await
        .map(Json)
        .map_err(|e| storage_error("update link", e))
}

/// Delete a link
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
    Path(id): Path<LinkId>,
) -> Result<StatusCode, ApiError> {
    state
        .storage
        .delete_link(&owner_id, id)
        .await
        .map_err(|e| storage_error("delete link", e))?;

    tracing::info!(owner_id = %owner_id, link_id = id, "link deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// The owner's profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
) -> Result<Json<Profile>, ApiError> {
    match state.storage.get_profile(&owner_id).await {
        Ok(Some(profile)) => Ok(Json(profile)),
        Ok(None) => Err(error(StatusCode::NOT_FOUND, "Profile not found")),
        Err(e) => Err(storage_error("load profile", e)),
    }
}

/// Create or update the owner's profile
pub async fn put_profile(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<Profile>, ApiError> {
    let draft = ProfileDraft::new(form).map_err(bad_request)?;

    match state.storage.upsert_profile(&owner_id, &draft).await {
        Ok(profile) => Ok(Json(profile)),
        Err(StorageError::Conflict) => {
            Err(error(StatusCode::CONFLICT, "Username already taken"))
        }
        Err(e) => Err(storage_error("update profile", e)),
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
