use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{anyhow, bail, Context, Result};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::OAuthConfig;

type KeySet = HashMap<String, Arc<DecodingKey>>;

/// Validates bearer JWTs against the issuer's JWKS and yields the subject,
/// which is used as the link owner id.
#[derive(Clone)]
pub struct OAuthValidator {
    issuer: String,
    audience: String,
    jwks_uri: String,
    client: Client,
    keys: Arc<RwLock<KeySet>>,
    fetched_at: Arc<RwLock<Option<Instant>>>,
    cache_ttl: Duration,
}

impl OAuthValidator {
    pub async fn from_config(config: &OAuthConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("linkpage-oauth/0.1.0")
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client for OAuth validation")?;

        let jwks_uri = match &config.jwks_url {
            Some(url) => url.clone(),
            None => discover_jwks_uri(&config.issuer_url, &client).await?,
        };

        let validator = Self {
            issuer: config.issuer_url.clone(),
            audience: config.audience.clone(),
            jwks_uri,
            client,
            keys: Arc::new(RwLock::new(HashMap::new())),
            fetched_at: Arc::new(RwLock::new(None)),
            cache_ttl: Duration::from_secs(config.jwks_cache_ttl_secs.max(60)),
        };

        validator.refresh_keys().await?;
        Ok(validator)
    }

    /// Check the token and return its `sub` claim.
    pub async fn owner_id(&self, token: &str) -> Result<String> {
        let header = decode_header(token).context("failed to parse token header")?;
        let kid = header
            .kid
            .ok_or_else(|| anyhow!("token header missing 'kid'"))?;
        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.validate_aud = false;
        validation.set_issuer(&[self.issuer.as_str()]);

        let claims = decode::<Value>(token, key.as_ref(), &validation)
            .context("token failed signature or structural validation")?
            .claims;

        if !audience_matches(claims.get("aud"), &self.audience) {
            bail!("token audience does not include expected value");
        }

        subject(&claims)
    }

    async fn key_for(&self, kid: &str) -> Result<Arc<DecodingKey>> {
        let expired = match *self.fetched_at.read().await {
            Some(at) => at.elapsed() > self.cache_ttl,
            None => true,
        };
        let missing = !self.keys.read().await.contains_key(kid);

        if expired || missing {
            debug!(kid, expired, missing, "refreshing JWKS");
            self.refresh_keys().await?;
        }

        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| anyhow!("no JWKS entry found for key id '{kid}'"))
    }

    async fn refresh_keys(&self) -> Result<()> {
        let jwks: JwkSet = self
            .client
            .get(&self.jwks_uri)
            .send()
            .await
            .context("failed to request JWKS")?
            .error_for_status()
            .context("JWKS endpoint returned an error status")?
            .json()
            .await
            .context("failed to parse JWKS response")?;

        let keys: KeySet = jwks
            .keys
            .into_iter()
            .filter_map(|jwk| match jwk.decoding_key() {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unusable JWKS entry: {err:#}");
                    None
                }
            })
            .collect();

        if keys.is_empty() {
            bail!("JWKS response did not contain any usable keys");
        }

        *self.keys.write().await = keys;
        *self.fetched_at.write().await = Some(Instant::now());
        Ok(())
    }
}

fn subject(claims: &Value) -> Result<String> {
    claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|sub| !sub.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("token missing 'sub' claim"))
}

fn audience_matches(aud_claim: Option<&Value>, expected: &str) -> bool {
    match aud_claim {
        Some(Value::String(aud)) => aud == expected,
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .any(|entry| entry == expected),
        _ => false,
    }
}

async fn discover_jwks_uri(issuer_url: &str, client: &Client) -> Result<String> {
    let issuer = issuer_url.trim_end_matches('/');
    let discovery_url = format!("{issuer}/.well-known/openid-configuration");
    let metadata: ProviderMetadata = client
        .get(&discovery_url)
        .send()
        .await
        .context("failed to request OpenID provider metadata")?
        .error_for_status()
        .context("OpenID provider metadata endpoint returned an error status")?
        .json()
        .await
        .context("failed to parse OpenID provider metadata")?;

    metadata
        .jwks_uri
        .ok_or_else(|| anyhow!("OpenID provider metadata did not include 'jwks_uri'"))
}

#[derive(Debug, Deserialize)]
struct ProviderMetadata {
    jwks_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    #[serde(default)]
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
    #[serde(default)]
    k: Option<String>,
}

impl Jwk {
    /// `Ok(None)` for entries that are valid but not usable here.
    fn decoding_key(self) -> Result<Option<(String, Arc<DecodingKey>)>> {
        let Some(kid) = self.kid else {
            return Ok(None);
        };

        let key = match self.kty.as_str() {
            "RSA" => {
                let n = self.n.ok_or_else(|| anyhow!("RSA key missing modulus"))?;
                let e = self.e.ok_or_else(|| anyhow!("RSA key missing exponent"))?;
                DecodingKey::from_rsa_components(&n, &e)?
            }
            "oct" => {
                let k = self.k.ok_or_else(|| anyhow!("symmetric key missing 'k'"))?;
                DecodingKey::from_base64_secret(&k)?
            }
            _ => return Ok(None),
        };

        Ok(Some((kid, Arc::new(key))))
    }
}
