use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AuthenticationError, RemoteClient, RemoteError, RemoteResult};
use crate::models::{Link, LinkChanges, LinkId};

/// Client for the JSON API served by `linkpage` (see `api::routes`).
///
/// The API scopes every request to the bearer token's owner, so the
/// `owner_id` arguments of the contract are only checked, never sent.
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    owner_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct CreateLinkBody<'a> {
    title: &'a str,
    url: &'a str,
    display_order: i64,
}

impl HttpClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("linkpage-client/0.1.0")
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        debug!(%status, %message, "remote request failed");

        Err(match status {
            StatusCode::NOT_FOUND => RemoteError::NotFound,
            StatusCode::CONFLICT => RemoteError::Conflict(message),
            _ => RemoteError::Transport(format!("{status}: {message}")),
        })
    }
}

#[async_trait]
impl RemoteClient for HttpClient {
    async fn current_owner_id(&self) -> Result<String, AuthenticationError> {
        if self.token.is_none() {
            return Err(AuthenticationError);
        }

        // Any failure here means no usable session; the cause is only logged.
        let response = match self.send(self.client.get(self.url("/api/session"))).await {
            Ok(response) => response,
            Err(RemoteError::Transport(cause)) => {
                warn!(%cause, "could not resolve session owner");
                return Err(AuthenticationError);
            }
            Err(err) => {
                debug!(error = %err, "session lookup rejected");
                return Err(AuthenticationError);
            }
        };

        match response.json::<SessionResponse>().await {
            Ok(session) => Ok(session.owner_id),
            Err(err) => {
                warn!(error = %err, "malformed session response");
                Err(AuthenticationError)
            }
        }
    }

    async fn list_links(&self, owner_id: &str) -> RemoteResult<Vec<Link>> {
        let response = self.send(self.client.get(self.url("/api/links"))).await?;
        let links: Vec<Link> = response
            .json()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if links.iter().any(|link| link.owner_id != owner_id) {
            return Err(RemoteError::Conflict(
                "listing belongs to a different owner than requested".to_string(),
            ));
        }
        Ok(links)
    }

    async fn create_link(
        &self,
        _owner_id: &str,
        title: &str,
        url: &str,
        display_order: i64,
    ) -> RemoteResult<Link> {
        let body = CreateLinkBody {
            title,
            url,
            display_order,
        };
        let response = self
            .send(self.client.post(self.url("/api/links")).json(&body))
            .await?;

        response
            .json()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))
    }

    async fn update_link(&self, id: LinkId, changes: &LinkChanges) -> RemoteResult<()> {
        self.send(
            self.client
                .patch(self.url(&format!("/api/links/{id}")))
                .json(changes),
        )
        .await?;
        Ok(())
    }

    async fn delete_link(&self, id: LinkId) -> RemoteResult<()> {
        self.send(self.client.delete(self.url(&format!("/api/links/{id}"))))
            .await?;
        Ok(())
    }
}
