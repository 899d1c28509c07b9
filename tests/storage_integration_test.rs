//! Integration tests for the storage backends
//!
//! Every scenario runs against SQLite and, when `DATABASE_URL` points at a
//! reachable server, PostgreSQL.
//!
//! Tests can be filtered by database backend using the DATABASE_BACKEND environment variable:
//! - `DATABASE_BACKEND=sqlite cargo test` - Run only SQLite tests
//! - `DATABASE_BACKEND=postgres cargo test` - Run only PostgreSQL tests
//! - By default, both backends are tested

use linkpage::models::{LinkChanges, NewLink, Theme};
use linkpage::storage::{PostgresStorage, SqliteStorage, Storage, StorageError};
use linkpage::validation::{ProfileDraft, ProfileForm};
use std::sync::Arc;

/// Get the database backend to test from environment variable
fn should_test_backend(backend: &str) -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == backend.to_lowercase(),
        Err(_) => true, // Test all backends if not specified
    }
}

/// Helper to create SQLite test storage
async fn create_sqlite_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Helper to create PostgreSQL test storage
async fn create_postgres_storage() -> Option<Arc<dyn Storage>> {
    let db_url = std::env::var("DATABASE_URL").ok()?;
    let storage = PostgresStorage::new(&db_url, 5).await.ok()?;
    storage.init().await.ok()?;
    Some(Arc::new(storage))
}

/// Owner ids and usernames unique per run, so a shared PostgreSQL database
/// can be reused.
fn unique(prefix: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}_{nanos}")
}

fn new_link(title: &str, order: Option<i64>) -> NewLink {
    NewLink {
        title: title.to_string(),
        url: format!("https://{title}.example"),
        display_order: order,
    }
}

fn profile(username: &str, theme: Option<&str>) -> ProfileDraft {
    ProfileDraft::new(ProfileForm {
        username: username.to_string(),
        full_name: "Test Owner".to_string(),
        bio: Some("hello".to_string()),
        avatar_url: None,
        theme: theme.map(str::to_string),
    })
    .unwrap()
}

async fn check_link_lifecycle(storage: Arc<dyn Storage>) {
    let owner = unique("lifecycle");

    let legacy = storage
        .create_link(&owner, &new_link("legacy", None))
        .await
        .unwrap();
    let second = storage
        .create_link(&owner, &new_link("second", Some(1)))
        .await
        .unwrap();
    let first = storage
        .create_link(&owner, &new_link("first", Some(0)))
        .await
        .unwrap();

    assert!(first.is_active);
    assert_eq!(first.owner_id, owner);

    let links = storage.list_links(&owner).await.unwrap();
    let titles: Vec<_> = links.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "second", "legacy"]);

    let updated = storage
        .update_link(
            &owner,
            second.id,
            &LinkChanges {
                title: Some("renamed".to_string()),
                is_active: Some(false),
                ..LinkChanges::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "renamed");
    assert_eq!(updated.url, second.url, "untouched fields keep their value");
    assert_eq!(updated.display_order, Some(1));
    assert!(!updated.is_active);

    let active: Vec<_> = storage
        .list_active_links(&owner)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(active, vec![first.id, legacy.id]);

    storage.delete_link(&owner, legacy.id).await.unwrap();
    assert!(matches!(
        storage.delete_link(&owner, legacy.id).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        storage
            .update_link(&owner, legacy.id, &LinkChanges::order(0))
            .await,
        Err(StorageError::NotFound)
    ));
    assert_eq!(storage.list_links(&owner).await.unwrap().len(), 2);
}

async fn check_concurrent_creation(storage: Arc<dyn Storage>) {
    let owner = unique("concurrent");

    let mut handles = vec![];
    for i in 0..10 {
        let storage_clone = Arc::clone(&storage);
        let owner = owner.clone();
        handles.push(tokio::spawn(async move {
            storage_clone
                .create_link(&owner, &new_link(&format!("link{i}"), Some(i)))
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let links = storage.list_links(&owner).await.unwrap();
    assert_eq!(links.len(), 10);
    let orders: Vec<_> = links.iter().map(|l| l.display_order).collect();
    assert_eq!(orders, (0..10).map(Some).collect::<Vec<_>>());
}

async fn check_profiles(storage: Arc<dyn Storage>) {
    let alice = unique("alice");
    let bob = unique("bob");
    let username = unique("name");

    assert!(storage.get_profile(&alice).await.unwrap().is_none());

    let created = storage
        .upsert_profile(&alice, &profile(&username, Some("dark")))
        .await
        .unwrap();
    assert_eq!(created.username, username);
    assert_eq!(created.theme, Theme::Dark);

    let by_name = storage
        .get_profile_by_username(&username)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_name.owner_id, alice);

    assert!(matches!(
        storage.upsert_profile(&bob, &profile(&username, None)).await,
        Err(StorageError::Conflict)
    ));

    let renamed = format!("{username}_2");
    let updated = storage
        .upsert_profile(&alice, &profile(&renamed, None))
        .await
        .unwrap();
    assert_eq!(updated.theme, Theme::Light);
    assert!(storage
        .get_profile_by_username(&username)
        .await
        .unwrap()
        .is_none());

    // The old name is free again.
    storage
        .upsert_profile(&bob, &profile(&username, None))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_link_lifecycle_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    check_link_lifecycle(create_sqlite_storage().await).await;
}

#[tokio::test]
async fn test_concurrent_creation_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    check_concurrent_creation(create_sqlite_storage().await).await;
}

#[tokio::test]
async fn test_profiles_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    check_profiles(create_sqlite_storage().await).await;
}

#[tokio::test]
async fn test_link_lifecycle_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        eprintln!("Skipping PostgreSQL test: DATABASE_URL not set or unreachable");
        return;
    };
    check_link_lifecycle(storage).await;
}

#[tokio::test]
async fn test_concurrent_creation_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        eprintln!("Skipping PostgreSQL test: DATABASE_URL not set or unreachable");
        return;
    };
    check_concurrent_creation(storage).await;
}

#[tokio::test]
async fn test_profiles_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        eprintln!("Skipping PostgreSQL test: DATABASE_URL not set or unreachable");
        return;
    };
    check_profiles(storage).await;
}
