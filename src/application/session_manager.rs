//! Session manager - network-facing session operations.
//!
//! Owns the calls that establish or end a session (`/check-auth`,
//! `/login`, `/register`, `/logout`) and delegates every principal change
//! to the shared [`SessionContext`].

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::gateway::{ApiCall, ApiGateway};
use super::session_context::SessionContext;
use crate::domain::foundation::{UserId, ValidationError};
use crate::domain::session::{Identity, OverlayCredential, OverlayEndReason, Principal};
use crate::ports::ApiError;
use http::Method;

#[derive(Debug, Deserialize)]
struct CheckAuthResponse {
    #[serde(default)]
    authenticated: bool,
    user_id: Option<i64>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    user_id: i64,
}

pub struct SessionManager {
    session: Arc<SessionContext>,
    gateway: Arc<ApiGateway>,
}

impl SessionManager {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self {
            session: gateway.session().clone(),
            gateway,
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Resolves the principal at startup.
    ///
    /// A persisted overlay bundle is trusted as-is. Otherwise the remembered
    /// identity is installed for a fast first paint and then reconciled
    /// against `/check-auth`.
    pub async fn bootstrap(&self) -> Principal {
        let store = self.session.store().clone();

        match store.load_overlay().await {
            Ok(Some(bundle)) => {
                if let Some(principal) = bundle.into_principal() {
                    info!("Restored overlay from persisted bundle");
                    self.session.restore(principal.clone()).await;
                    return principal;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read overlay bundle"),
        }

        match store.load_remembered().await {
            Ok(Some(remembered)) => {
                debug!(user_id = %remembered.0.user_id, "Painting remembered identity");
                self.session
                    .restore(Principal::Authenticated(remembered.0))
                    .await;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read remembered identity"),
        }

        let checked = self
            .gateway
            .send(ApiCall::new(Method::GET, "/check-auth").reporting_unauthorized())
            .await;

        match checked.map(serde_json::from_value::<CheckAuthResponse>) {
            Ok(Ok(CheckAuthResponse {
                authenticated: true,
                user_id: Some(user_id),
                email: Some(email),
            })) => match Identity::new(UserId::new(user_id), email) {
                Ok(identity) => return self.session.sign_in(identity).await,
                Err(e) => {
                    warn!(error = %e, "Identity check returned an invalid identity");
                    self.session.settle_anonymous(true).await;
                }
            },
            Ok(_) => {
                debug!("Identity check: not authenticated");
                self.session.settle_anonymous(true).await;
            }
            Err(e) => {
                // Only a definite answer forgets the remembered identity.
                let definite = matches!(e, ApiError::Validation { status: 401, .. });
                warn!(error = %e, "Identity check failed");
                self.session.settle_anonymous(definite).await;
            }
        }
        Principal::Anonymous
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the classified `ApiError`; a rejected password arrives as
    /// `ApiError::Validation` and leaves the session untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<Principal, ApiError> {
        let body = json!({ "email": email, "password": password });
        self.sign_in_at("/login", email, body).await
    }

    /// Creates an account and signs in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        location: &str,
    ) -> Result<Principal, ApiError> {
        let body = json!({ "email": email, "password": password, "location": location });
        self.sign_in_at("/register", email, body).await
    }

    async fn sign_in_at(
        &self,
        path: &str,
        email: &str,
        body: serde_json::Value,
    ) -> Result<Principal, ApiError> {
        let response = self
            .gateway
            .send(
                ApiCall::new(Method::POST, path)
                    .with_body(body)
                    .reporting_unauthorized(),
            )
            .await?;

        let parsed: SignInResponse =
            serde_json::from_value(response).map_err(|e| ApiError::decode(e.to_string()))?;
        let identity = Identity::new(UserId::new(parsed.user_id), email)
            .map_err(|e| ApiError::decode(e.to_string()))?;

        Ok(self.session.sign_in(identity).await)
    }

    /// Ends the session. The server call is best effort; the local reset
    /// always happens.
    pub async fn logout(&self) {
        let result = self
            .gateway
            .send(
                ApiCall::new(Method::POST, "/logout")
                    .with_body(json!({}))
                    .reporting_unauthorized(),
            )
            .await;
        if let Err(e) = result {
            warn!(error = %e, "Logout request failed, resetting locally");
        }
        self.session.sign_out().await;
    }

    pub async fn start_overlay(
        &self,
        credential: OverlayCredential,
        target: Identity,
    ) -> Result<Principal, ValidationError> {
        self.session.start_overlay(credential, target).await
    }

    pub async fn stop_overlay(&self) -> Option<Identity> {
        self.session.stop_overlay(OverlayEndReason::Manual).await
    }

    pub async fn principal(&self) -> Principal {
        self.session.principal().await
    }

    pub async fn current_auth_header(&self) -> Option<String> {
        self.session.current_auth_header().await
    }

    pub async fn session_message(&self) -> Option<String> {
        self.session.session_message().await
    }

    pub async fn clear_session_message(&self) {
        self.session.clear_session_message().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySessionStore, MockTransport};
    use crate::config::ApiConfig;
    use crate::domain::session::{PersistedOverlayBundle, RememberedIdentity};
    use crate::ports::{SessionStore, TransportError};

    fn setup() -> (SessionManager, MockTransport, InMemorySessionStore) {
        let transport = MockTransport::new();
        let store = InMemorySessionStore::new();
        let session = Arc::new(SessionContext::new(Arc::new(store.clone())));
        let gateway = Arc::new(ApiGateway::new(
            Arc::new(transport.clone()),
            session,
            ApiConfig {
                base_url: "http://api.test".to_string(),
                ..Default::default()
            },
        ));
        (SessionManager::new(gateway), transport, store)
    }

    fn identity(id: i64, email: &str) -> Identity {
        Identity::new(UserId::new(id), email).unwrap()
    }

    #[tokio::test]
    async fn login_signs_in_with_returned_id() {
        let (manager, transport, store) = setup();
        transport.reply_json(Method::POST, "/login", 200, json!({"user_id": 9}));

        let principal = manager.login("me@example.com", "pw").await.unwrap();

        assert_eq!(principal, Principal::Authenticated(identity(9, "me@example.com")));
        assert!(store.load_remembered().await.unwrap().is_some());
        let call = transport.last_call(&Method::POST, "/login").unwrap();
        assert_eq!(call.body, Some(json!({"email": "me@example.com", "password": "pw"})));
    }

    #[tokio::test]
    async fn failed_login_keeps_anonymous_without_expiry_message() {
        let (manager, transport, _) = setup();
        transport.reply_json(Method::POST, "/login", 401, json!({"error": "Invalid credentials"}));

        let err = manager.login("me@example.com", "bad").await.unwrap_err();

        assert_eq!(err.user_message(), "Invalid credentials");
        assert!(manager.principal().await.is_anonymous());
        assert_eq!(manager.session_message().await, None);
    }

    #[tokio::test]
    async fn register_posts_location() {
        let (manager, transport, _) = setup();
        transport.reply_json(Method::POST, "/register", 201, json!({"user_id": 3}));

        manager.register("new@example.com", "pw", "Lisbon").await.unwrap();

        let call = transport.last_call(&Method::POST, "/register").unwrap();
        assert_eq!(call.body.unwrap()["location"], "Lisbon");
    }

    #[tokio::test]
    async fn bootstrap_trusts_overlay_bundle_without_network() {
        let (manager, transport, store) = setup();
        store
            .save_overlay(&PersistedOverlayBundle {
                is_impersonating: true,
                overlay_credential: "imp".to_string(),
                original_identity: identity(1, "admin@example.com"),
                impersonated_identity: identity(2, "user@example.com"),
            })
            .await
            .unwrap();

        let principal = manager.bootstrap().await;

        assert!(principal.is_overlay());
        assert_eq!(manager.current_auth_header().await.as_deref(), Some("Bearer imp"));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn bootstrap_confirms_with_identity_check() {
        let (manager, transport, _) = setup();
        transport.reply_json(
            Method::GET,
            "/check-auth",
            200,
            json!({"authenticated": true, "user_id": 5, "email": "five@example.com"}),
        );

        let principal = manager.bootstrap().await;

        assert_eq!(principal, Principal::Authenticated(identity(5, "five@example.com")));
    }

    #[tokio::test]
    async fn bootstrap_unauthenticated_forgets_remembered_identity() {
        let (manager, transport, store) = setup();
        store
            .save_remembered(&RememberedIdentity(identity(5, "five@example.com")))
            .await
            .unwrap();
        transport.reply_json(Method::GET, "/check-auth", 401, json!({"authenticated": false}));

        let principal = manager.bootstrap().await;

        assert!(principal.is_anonymous());
        assert!(manager.principal().await.is_anonymous());
        assert!(store.load_remembered().await.unwrap().is_none());
        assert_eq!(manager.session_message().await, None);
    }

    #[tokio::test]
    async fn bootstrap_offline_keeps_remembered_record() {
        let (manager, transport, store) = setup();
        store
            .save_remembered(&RememberedIdentity(identity(5, "five@example.com")))
            .await
            .unwrap();
        transport.fail(Method::GET, "/check-auth", TransportError::Timeout);

        let principal = manager.bootstrap().await;

        assert!(principal.is_anonymous());
        assert!(store.load_remembered().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn logout_resets_even_when_server_fails() {
        let (manager, transport, store) = setup();
        transport.reply_json(Method::POST, "/login", 200, json!({"user_id": 9}));
        manager.login("me@example.com", "pw").await.unwrap();
        transport.reply_json(Method::POST, "/logout", 500, json!({"error": "boom"}));

        manager.logout().await;

        assert!(manager.principal().await.is_anonymous());
        assert!(!store.has_any().await);
    }
}
