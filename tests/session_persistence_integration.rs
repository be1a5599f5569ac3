//! Integration tests for session records kept on disk.
//!
//! A second client over the same state directory stands in for a reload.

use http::Method;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use wardrobe_sync::adapters::{FileSessionStore, MockPushTransport, MockTransport};
use wardrobe_sync::application::WardrobeClient;
use wardrobe_sync::config::{ApiConfig, ClientConfig, PersistenceConfig};
use wardrobe_sync::domain::foundation::UserId;
use wardrobe_sync::domain::session::{Identity, Principal};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn config(dir: &Path) -> ClientConfig {
    ClientConfig {
        api: ApiConfig {
            base_url: "http://api.test".to_string(),
            ..Default::default()
        },
        persistence: PersistenceConfig {
            state_dir: Some(dir.to_path_buf()),
        },
        ..Default::default()
    }
}

async fn client(dir: &Path, http: &MockTransport) -> WardrobeClient {
    let push = MockPushTransport::new();
    for _ in 0..3 {
        push.queue_connection();
    }
    WardrobeClient::new(
        config(dir),
        Arc::new(http.clone()),
        Arc::new(push),
        Arc::new(FileSessionStore::new(dir)),
    )
    .await
}

fn admin() -> Identity {
    Identity::new(UserId::new(1), "admin@example.com").unwrap()
}

fn customer() -> Identity {
    Identity::new(UserId::new(2), "customer@example.com").unwrap()
}

async fn sign_in_and_impersonate(client: &WardrobeClient, http: &MockTransport) {
    http.reply_json(Method::POST, "/login", 200, json!({"user_id": 1}));
    http.always_json(Method::GET, "/get-wardrobe", 200, json!({"items": []}));
    http.always_json(Method::GET, "/notifications", 200, json!([]));
    http.reply_json(
        Method::POST,
        "/admin/users/2/impersonate",
        200,
        json!({"impersonation_token": "imp-2"}),
    );
    client.login("admin@example.com", "secret").await.unwrap();
    client.impersonate(customer()).await.unwrap();
}

// =============================================================================
// Reload
// =============================================================================

#[tokio::test]
async fn overlay_survives_reload_without_identity_check() {
    let dir = TempDir::new().unwrap();
    let http = MockTransport::new();
    let first = client(dir.path(), &http).await;
    sign_in_and_impersonate(&first, &http).await;
    assert!(dir.path().join("remembered_identity.yaml").exists());
    assert!(dir.path().join("overlay_bundle.yaml").exists());

    let reloaded_http = MockTransport::new();
    let reloaded = client(dir.path(), &reloaded_http).await;
    let principal = reloaded.bootstrap().await;

    assert_eq!(principal.identity(), Some(&customer()));
    assert_eq!(principal.original_identity(), Some(&admin()));
    assert_eq!(reloaded_http.call_count(&Method::GET, "/check-auth"), 0);
    assert_eq!(
        reloaded.sessions().current_auth_header().await.as_deref(),
        Some("Bearer imp-2")
    );
}

#[tokio::test]
async fn stopping_the_overlay_forgets_the_bundle() {
    let dir = TempDir::new().unwrap();
    let http = MockTransport::new();
    let client = client(dir.path(), &http).await;
    sign_in_and_impersonate(&client, &http).await;

    let restored = client.stop_impersonating().await;

    assert_eq!(restored, Some(admin()));
    assert!(!dir.path().join("overlay_bundle.yaml").exists());
    assert!(dir.path().join("remembered_identity.yaml").exists());
}

#[tokio::test]
async fn remembered_identity_is_kept_while_offline() {
    let dir = TempDir::new().unwrap();
    let http = MockTransport::new();
    let first = client(dir.path(), &http).await;
    http.reply_json(Method::POST, "/login", 200, json!({"user_id": 1}));
    first.login("admin@example.com", "secret").await.unwrap();

    let offline = MockTransport::new();
    offline.fail(
        Method::GET,
        "/check-auth",
        wardrobe_sync::ports::TransportError::Connect("connection refused".to_string()),
    );
    let reloaded = client(dir.path(), &offline).await;

    assert_eq!(reloaded.bootstrap().await, Principal::Anonymous);
    assert!(dir.path().join("remembered_identity.yaml").exists());
}

#[tokio::test]
async fn logout_removes_both_records() {
    let dir = TempDir::new().unwrap();
    let http = MockTransport::new();
    let client = client(dir.path(), &http).await;
    sign_in_and_impersonate(&client, &http).await;
    http.reply_json(Method::POST, "/logout", 200, json!({"message": "Logged out"}));

    client.logout().await;

    assert!(!dir.path().join("remembered_identity.yaml").exists());
    assert!(!dir.path().join("overlay_bundle.yaml").exists());

    http.reply_json(Method::GET, "/check-auth", 401, json!({"error": "Unauthorized"}));
    assert_eq!(client.bootstrap().await, Principal::Anonymous);
    assert_eq!(client.session_message().await, None);
}
