//! HTTP client integration tests
//!
//! `HttpClient` is driven against the owner API served on an ephemeral
//! port, and against a small stub router for the error statuses the API
//! itself never produces on link routes.

use axum::{
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use linkpage::api;
use linkpage::auth::AuthService;
use linkpage::models::{Link, LinkChanges};
use linkpage::notify::ChannelNotifier;
use linkpage::remote::{AuthenticationError, HttpClient, RemoteClient, RemoteError};
use linkpage::storage::{SqliteStorage, Storage};
use linkpage::validation::LinkDraft;
use linkpage::{LinkCollection, MutationCoordinator};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const OWNER: &str = "dev-owner";

/// Helper to create test storage
async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Serve `app` on 127.0.0.1 with an OS-assigned port and return its base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn serve_api(storage: &Arc<dyn Storage>) -> String {
    let auth_service = Arc::new(AuthService::disabled(OWNER));
    serve(api::create_api_router(Arc::clone(storage), auth_service)).await
}

fn client(base_url: &str, token: Option<&str>) -> HttpClient {
    HttpClient::new(
        base_url,
        token.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn foreign_link() -> Link {
    Link {
        id: 1,
        owner_id: "someone-else".to_string(),
        title: "theirs".to_string(),
        url: "https://theirs.example".to_string(),
        display_order: Some(0),
        is_active: true,
        created_at: 0,
    }
}

#[tokio::test]
async fn test_no_token_is_not_signed_in() {
    let storage = create_test_storage().await;
    let base_url = serve_api(&storage).await;

    let result = client(&base_url, None).current_owner_id().await;
    assert_eq!(result, Err(AuthenticationError));
}

#[tokio::test]
async fn test_session_resolves_owner_with_auth_disabled() {
    let storage = create_test_storage().await;
    let base_url = serve_api(&storage).await;

    let owner = client(&base_url, Some("any-token"))
        .current_owner_id()
        .await
        .unwrap();
    assert_eq!(owner, OWNER);
}

#[tokio::test]
async fn test_link_crud_round_trip() {
    let storage = create_test_storage().await;
    let base_url = serve_api(&storage).await;
    let http = client(&base_url, Some("token"));

    let first = http
        .create_link(OWNER, "First", "https://first.example", 0)
        .await
        .unwrap();
    let second = http
        .create_link(OWNER, "Second", "https://second.example", 1)
        .await
        .unwrap();
    assert_eq!(first.owner_id, OWNER);
    assert_eq!(second.display_order, Some(1));

    http.update_link(first.id, &LinkChanges::order(2))
        .await
        .unwrap();

    let listed = http.list_links(OWNER).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    http.delete_link(second.id).await.unwrap();
    assert_eq!(storage.list_links(OWNER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_link_maps_to_not_found() {
    let storage = create_test_storage().await;
    let base_url = serve_api(&storage).await;
    let http = client(&base_url, Some("token"));

    assert_eq!(http.delete_link(404).await, Err(RemoteError::NotFound));
    assert_eq!(
        http.update_link(404, &LinkChanges::order(0)).await,
        Err(RemoteError::NotFound)
    );
}

#[tokio::test]
async fn test_listing_for_other_owner_is_rejected() {
    let storage = create_test_storage().await;
    let base_url = serve_api(&storage).await;
    let http = client(&base_url, Some("token"));

    http.create_link(OWNER, "Mine", "https://mine.example", 0)
        .await
        .unwrap();

    let result = http.list_links("not-the-session-owner").await;
    assert!(matches!(result, Err(RemoteError::Conflict(_))));
}

#[tokio::test]
async fn test_error_statuses_map_to_remote_errors() {
    let app = Router::new()
        .route(
            "/api/session",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "database down"})),
                )
            }),
        )
        .route(
            "/api/links",
            get(|| async { Json(vec![foreign_link()]) }),
        )
        .route(
            "/api/links/{id}",
            patch(|| async {
                (
                    StatusCode::CONFLICT,
                    Json(json!({"error": "order already taken"})),
                )
            })
            .delete(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
    let base_url = serve(app).await;
    let http = client(&base_url, Some("token"));

    assert_eq!(
        http.update_link(1, &LinkChanges::order(0)).await,
        Err(RemoteError::Conflict("order already taken".to_string()))
    );

    match http.delete_link(1).await {
        Err(RemoteError::Transport(message)) => assert!(message.starts_with("503")),
        other => panic!("Unexpected result: {other:?}"),
    }

    assert!(matches!(
        http.list_links(OWNER).await,
        Err(RemoteError::Conflict(_))
    ));

    // A failing session lookup leaves the editor without an owner.
    assert_eq!(http.current_owner_id().await, Err(AuthenticationError));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let http = client(&base_url, Some("token"));
    assert!(matches!(
        http.list_links(OWNER).await,
        Err(RemoteError::Transport(_))
    ));
    assert_eq!(http.current_owner_id().await, Err(AuthenticationError));
}

#[tokio::test]
async fn test_coordinator_over_http() {
    let storage = create_test_storage().await;
    let base_url = serve_api(&storage).await;
    let http = Arc::new(client(&base_url, Some("token")));

    let collection = Arc::new(LinkCollection::new(http));
    let (notifier, _notifications) = ChannelNotifier::new();
    let coordinator = MutationCoordinator::new(Arc::clone(&collection), Arc::new(notifier));
    coordinator.refresh().await.unwrap();

    let mut ids = Vec::new();
    for url in ["a.example", "b.example", "c.example"] {
        let draft = LinkDraft::new(url, None).unwrap();
        ids.push(coordinator.add(draft).await.unwrap().id);
    }

    coordinator.reorder(ids[2], ids[0]).await.unwrap();

    let stored: Vec<_> = storage
        .list_links(OWNER)
        .await
        .unwrap()
        .iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(stored, vec![ids[2], ids[0], ids[1]]);

    let local: Vec<_> = collection.snapshot().await.iter().map(|l| l.id).collect();
    assert_eq!(local, stored);
}
