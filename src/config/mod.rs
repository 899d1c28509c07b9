use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub public_server: ServerConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    None,
    Oauth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Owner every request acts as when authentication is disabled
    pub dev_owner_id: String,
    #[serde(default)]
    pub oauth: Option<OAuthConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub issuer_url: String,
    pub audience: String,
    #[serde(default)]
    pub jwks_url: Option<String>,
    #[serde(default = "OAuthConfig::default_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,
}

/// Public page read cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
}

/// Settings for `HttpClient` when the admin CLI talks to a remote server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl OAuthConfig {
    const fn default_cache_ttl_secs() -> u64 {
        300
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_backend(raw: &str) -> DatabaseBackend {
    match raw.to_lowercase().as_str() {
        "postgres" | "postgresql" => DatabaseBackend::Postgres,
        _ => DatabaseBackend::Sqlite,
    }
}

fn parse_auth_mode(raw: &str) -> AuthMode {
    match raw.to_lowercase().as_str() {
        "none" => AuthMode::None,
        "oauth" => AuthMode::Oauth,
        other => {
            tracing::warn!(
                "Unknown AUTH_MODE '{other}', falling back to 'none'. Supported values: none, oauth"
            );
            AuthMode::None
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend = parse_backend(&env_or("DATABASE_BACKEND", "sqlite"));
        let database_url = env_or("DATABASE_URL", "sqlite://./linkpage.db?mode=rwc");
        let max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 5u32)?;

        let auth_mode = parse_auth_mode(&env_or("AUTH_MODE", "none"));

        let oauth = if matches!(auth_mode, AuthMode::Oauth) {
            let issuer_url = std::env::var("OAUTH_ISSUER_URL")
                .context("OAUTH_ISSUER_URL must be set when AUTH_MODE=oauth")?;
            let audience = std::env::var("OAUTH_AUDIENCE")
                .context("OAUTH_AUDIENCE must be set when AUTH_MODE=oauth")?;
            let jwks_url = std::env::var("OAUTH_JWKS_URL").ok();
            let jwks_cache_ttl_secs = std::env::var("OAUTH_JWKS_CACHE_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or_else(OAuthConfig::default_cache_ttl_secs);

            Some(OAuthConfig {
                issuer_url,
                audience,
                jwks_url,
                jwks_cache_ttl_secs,
            })
        } else {
            None
        };

        let api_port = parse_env("API_PORT", 8080u16)?;

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: env_or("API_HOST", "127.0.0.1"),
                port: api_port,
            },
            public_server: ServerConfig {
                host: env_or("PUBLIC_HOST", "127.0.0.1"),
                port: parse_env("PUBLIC_PORT", 3000u16)?,
            },
            auth: AuthConfig {
                mode: auth_mode,
                dev_owner_id: env_or("DEV_OWNER_ID", "local-dev"),
                oauth,
            },
            cache: CacheConfig {
                max_entries: parse_env("CACHE_MAX_ENTRIES", 10_000u64)?,
                ttl_secs: parse_env("CACHE_TTL_SECS", 60u64)?,
            },
            client: ClientConfig {
                base_url: env_or("CLIENT_BASE_URL", &format!("http://127.0.0.1:{api_port}")),
                timeout_secs: parse_env("CLIENT_TIMEOUT_SECS", 10u64)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        assert_eq!(parse_backend("Postgres"), DatabaseBackend::Postgres);
        assert_eq!(parse_backend("postgresql"), DatabaseBackend::Postgres);
        assert_eq!(parse_backend("sqlite"), DatabaseBackend::Sqlite);
        assert_eq!(parse_backend("anything"), DatabaseBackend::Sqlite);
    }

    #[test]
    fn unknown_auth_mode_falls_back_to_none() {
        assert_eq!(parse_auth_mode("OAUTH"), AuthMode::Oauth);
        assert_eq!(parse_auth_mode("none"), AuthMode::None);
        assert_eq!(parse_auth_mode("cloud"), AuthMode::None);
    }

    #[test]
    fn parse_env_reports_bad_values() {
        std::env::set_var("LINKPAGE_TEST_PORT", "not-a-port");
        let err = parse_env("LINKPAGE_TEST_PORT", 1u16).unwrap_err();
        assert!(err.to_string().contains("LINKPAGE_TEST_PORT"));
        std::env::remove_var("LINKPAGE_TEST_PORT");

        assert_eq!(parse_env("LINKPAGE_TEST_UNSET", 7u16).unwrap(), 7);
    }
}
