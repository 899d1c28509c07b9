pub mod oauth;

use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::handlers::ErrorResponse;
use crate::config::{AuthConfig, AuthMode};
use oauth::OAuthValidator;

/// Owner of the request, set by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedOwner(pub String);

/// Resolves bearer tokens to owner ids.
pub struct AuthService {
    mode: AuthMode,
    dev_owner_id: String,
    oauth: Option<OAuthValidator>,
}

impl AuthService {
    pub async fn new(config: AuthConfig) -> Result<Self> {
        let oauth = match config.mode {
            AuthMode::Oauth => {
                let oauth_config = config
                    .oauth
                    .as_ref()
                    .context("OAuth configuration missing for AUTH_MODE=oauth")?;
                Some(OAuthValidator::from_config(oauth_config).await?)
            }
            AuthMode::None => None,
        };

        Ok(Self {
            mode: config.mode,
            dev_owner_id: config.dev_owner_id,
            oauth,
        })
    }

    /// Authentication disabled: every request acts as `dev_owner_id`.
    pub fn disabled(dev_owner_id: impl Into<String>) -> Self {
        Self {
            mode: AuthMode::None,
            dev_owner_id: dev_owner_id.into(),
            oauth: None,
        }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Option<String> {
        match self.mode {
            AuthMode::None => Some(self.dev_owner_id.clone()),
            AuthMode::Oauth => {
                let token = bearer_token(headers)?;
                let validator = self.oauth.as_ref()?;
                match validator.owner_id(token).await {
                    Ok(owner_id) => Some(owner_id),
                    Err(err) => {
                        debug!("rejecting bearer token: {err:#}");
                        None
                    }
                }
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    match auth_service.authenticate(request.headers()).await {
        Some(owner_id) => {
            request
                .extensions_mut()
                .insert(AuthenticatedOwner(owner_id));
            next.run(request).await
        }
        None => {
            warn!(path = %request.uri().path(), "unauthenticated API request");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing bearer token".to_string(),
                }),
            )
                .into_response()
        }
    }
}
