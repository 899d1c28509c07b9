use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use linkpage::config::{Config, DatabaseBackend};
use linkpage::models::Link;
use linkpage::notify::TracingNotifier;
use linkpage::remote::{HttpClient, RemoteClient, Session, StoreClient};
use linkpage::storage::{PostgresStorage, SqliteStorage, Storage};
use linkpage::validation::{LinkDraft, LinkPatch};
use linkpage::{LinkCollection, MutationCoordinator};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "linkpage-admin")]
#[command(about = "Linkpage link and profile management CLI", long_about = None)]
struct Cli {
    /// Act through the HTTP API with this bearer token instead of the local database
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List an owner's links in display order
    Links {
        /// Owner ID (sub claim from JWT)
        owner_id: String,
    },
    /// Add a link at the end of an owner's list
    Add {
        owner_id: String,
        url: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Change a link's title and/or URL
    Edit {
        owner_id: String,
        link_id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Delete a link
    Remove { owner_id: String, link_id: i64 },
    /// Move a link onto another link's position
    Move {
        owner_id: String,
        link_id: i64,
        target_id: i64,
    },
    /// Rewrite display orders to 0..n-1, closing holes left by deletes
    Normalize { owner_id: String },
    /// Show an owner's profile
    Profile { owner_id: String },
}

async fn open_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
        DatabaseBackend::Postgres => Arc::new(
            PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
    };
    storage.init().await?;
    Ok(storage)
}

fn print_links(links: &[Link]) {
    if links.is_empty() {
        println!("No links yet.");
        return;
    }
    println!(
        "{:<6} {:<6} {:<8} {:<24} {:<20} URL",
        "Order", "ID", "Active", "Title", "Created"
    );
    println!("{}", "-".repeat(100));
    for link in links {
        let created = DateTime::<Utc>::from_timestamp(link.created_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let order = link
            .display_order
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<6} {:<8} {:<24} {:<20} {}",
            order, link.id, link.is_active, link.title, created, link.url
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Profile and normalize work on the database directly.
    match &cli.command {
        Commands::Normalize { owner_id } => {
            if cli.token.is_some() {
                bail!("normalize only runs against the local database");
            }
            let storage = open_storage(&config).await?;
            let changed = storage.normalize_order(owner_id).await?;
            println!("✓ Rewrote {changed} display order(s) for '{owner_id}'");
            return Ok(());
        }
        Commands::Profile { owner_id } => {
            if cli.token.is_some() {
                bail!("profile only runs against the local database");
            }
            let storage = open_storage(&config).await?;
            match storage.get_profile(owner_id).await? {
                Some(profile) => {
                    println!("Username:  {}", profile.username);
                    println!("Name:      {}", profile.full_name);
                    println!("Bio:       {}", profile.bio);
                    println!("Theme:     {}", profile.theme);
                    println!(
                        "Avatar:    {}",
                        profile.avatar_url.as_deref().unwrap_or("N/A")
                    );
                }
                None => println!("No profile for '{owner_id}'."),
            }
            return Ok(());
        }
        _ => {}
    }

    let owner_id = match &cli.command {
        Commands::Links { owner_id }
        | Commands::Add { owner_id, .. }
        | Commands::Edit { owner_id, .. }
        | Commands::Remove { owner_id, .. }
        | Commands::Move { owner_id, .. }
        | Commands::Normalize { owner_id }
        | Commands::Profile { owner_id } => owner_id.clone(),
    };

    let client: Arc<dyn RemoteClient> = match cli.token.clone() {
        Some(token) => Arc::new(HttpClient::new(
            &config.client.base_url,
            Some(token),
            Duration::from_secs(config.client.timeout_secs),
        )?),
        None => {
            let storage = open_storage(&config).await?;
            Arc::new(StoreClient::new(
                storage,
                Arc::new(Session::signed_in(owner_id.clone())),
            ))
        }
    };

    let collection = Arc::new(LinkCollection::new(client));
    let coordinator =
        MutationCoordinator::new(Arc::clone(&collection), Arc::new(TracingNotifier));
    coordinator.refresh().await.context("failed to load links")?;

    if collection.owner_id().await.as_deref() != Some(owner_id.as_str()) {
        bail!("token does not belong to owner '{owner_id}'");
    }

    match cli.command {
        Commands::Links { .. } | Commands::Normalize { .. } | Commands::Profile { .. } => {}
        Commands::Add { url, title, .. } => {
            let draft = LinkDraft::new(&url, title.as_deref())?;
            let link = coordinator.add(draft).await?;
            println!("✓ Added link {} ({})", link.id, link.url);
        }
        Commands::Edit {
            link_id,
            title,
            url,
            ..
        } => {
            let patch = LinkPatch::new(title.as_deref(), url.as_deref())?;
            coordinator.edit(link_id, patch).await?;
            println!("✓ Updated link {link_id}");
        }
        Commands::Remove { link_id, .. } => {
            coordinator.delete(link_id).await?;
            println!("✓ Deleted link {link_id}");
        }
        Commands::Move {
            link_id, target_id, ..
        } => {
            coordinator.reorder(link_id, target_id).await?;
            println!("✓ Moved link {link_id} onto {target_id}");
        }
    }

    print_links(&collection.snapshot().await);
    Ok(())
}
