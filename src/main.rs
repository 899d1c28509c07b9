use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use linkpage::api;
use linkpage::auth::AuthService;
use linkpage::config::{AuthMode, Config, DatabaseBackend};
use linkpage::public;
use linkpage::storage::{CachedStorage, PostgresStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let database: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(
                SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(
                PostgresStorage::new(&config.database.url, config.database.max_connections)
                    .await?,
            )
        }
    };

    info!("Initializing database...");
    database.init().await?;
    info!("Database initialized successfully");

    let storage: Arc<dyn Storage> = Arc::new(CachedStorage::new(
        database,
        config.cache.max_entries,
        config.cache.ttl_secs,
    ));

    let auth_config = config.auth.clone();
    let auth_service = Arc::new(AuthService::new(auth_config.clone()).await?);

    match auth_config.mode {
        AuthMode::None => {
            info!(
                "🔓 Authentication is disabled - all API requests act as '{}'",
                auth_config.dev_owner_id
            );
        }
        AuthMode::Oauth => {
            if let Some(oauth) = auth_config.oauth.as_ref() {
                info!(
                    "🔐 OAuth authentication enabled (issuer: {}, audience: {})",
                    oauth.issuer_url, oauth.audience
                );
            }
        }
    }

    let api_router = api::create_api_router(Arc::clone(&storage), auth_service);
    let public_router = public::create_public_router(Arc::clone(&storage));

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);

    let public_addr = format!(
        "{}:{}",
        config.public_server.host, config.public_server.port
    );
    let public_listener = tokio::net::TcpListener::bind(&public_addr).await?;
    info!("🚀 Public pages served on http://{}/u/<username>", public_addr);

    tokio::try_join!(
        axum::serve(api_listener, api_router),
        axum::serve(public_listener, public_router),
    )?;

    Ok(())
}
