//! API gateway - the one place server responses are classified.
//!
//! Every call carries a JSON content type, the ambient cookie (held by the
//! transport) and, inside an overlay, the overlay bearer credential.
//!
//! | Response | Result |
//! |---|---|
//! | 401 | session policy, then `ApiError::Unauthorized` |
//! | other non-2xx | `Validation` (4xx) or `Server` (5xx) with the parsed body |
//! | 2xx JSON | parsed body |
//! | 2xx anything else | `{}` |

use http::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::session_context::SessionContext;
use crate::config::ApiConfig;
use crate::ports::{ApiError, HttpRequest, HttpTransport};

/// What a 401 on this call means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnauthorizedPolicy {
    /// Apply the session policy: end the overlay or expire the session.
    #[default]
    ExpireSession,
    /// Report the 401 to the caller as a rejected request and leave the
    /// session alone (login, identity check).
    Report,
}

/// One API call.
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub on_unauthorized: UnauthorizedPolicy,
}

impl ApiCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            on_unauthorized: UnauthorizedPolicy::default(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn reporting_unauthorized(mut self) -> Self {
        self.on_unauthorized = UnauthorizedPolicy::Report;
        self
    }
}

/// Uniform HTTP call wrapper.
pub struct ApiGateway {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionContext>,
    config: ApiConfig,
}

impl ApiGateway {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionContext>,
        config: ApiConfig,
    ) -> Self {
        Self {
            transport,
            session,
            config,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    /// `request(path, method, body?) -> JSON | {}`.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut call = ApiCall::new(method, path);
        call.body = body;
        self.send(call).await
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.send(ApiCall::new(Method::GET, path)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiCall::new(Method::POST, path).with_body(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiCall::new(Method::PUT, path).with_body(body)).await
    }

    pub async fn patch(&self, path: &str) -> Result<Value, ApiError> {
        self.send(ApiCall::new(Method::PATCH, path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.send(ApiCall::new(Method::DELETE, path)).await
    }

    /// Sends `call` and classifies the response.
    ///
    /// # Errors
    ///
    /// See the module table. Transport failures become `ApiError::Network`.
    pub async fn send(&self, call: ApiCall) -> Result<Value, ApiError> {
        let auth = self.session.auth_snapshot().await;

        let mut request = HttpRequest::new(call.method.clone(), self.url(&call.path))
            .with_header("Content-Type", "application/json");
        if let Some(header) = &auth.header {
            request = request.with_header("Authorization", header.clone());
        }
        if let Some(body) = call.body {
            request = request.with_body(body);
        }
        let request_id = request.id;

        debug!(
            %request_id,
            method = %call.method,
            path = %call.path,
            overlay = auth.is_overlay,
            "API request"
        );

        let response = self.transport.send(request).await.map_err(|e| {
            warn!(%request_id, path = %call.path, error = %e, "API request failed");
            ApiError::from(e)
        })?;

        if response.status == 401 {
            warn!(%request_id, path = %call.path, overlay = auth.is_overlay, "API returned 401");
            return Err(match call.on_unauthorized {
                UnauthorizedPolicy::ExpireSession => self.session.handle_unauthorized(&auth).await,
                UnauthorizedPolicy::Report => ApiError::from_status(401, &response.body),
            });
        }

        if !response.is_success() {
            let error = ApiError::from_status(response.status, &response.body);
            warn!(
                %request_id,
                path = %call.path,
                status = response.status,
                error = %error,
                "API returned error"
            );
            return Err(error);
        }

        if response.is_json() && !response.body.trim().is_empty() {
            serde_json::from_str(&response.body).map_err(|e| ApiError::decode(e.to_string()))
        } else {
            Ok(Value::Object(Map::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySessionStore, MockTransport};
    use crate::domain::foundation::UserId;
    use crate::domain::session::{Identity, OverlayCredential, Principal};
    use crate::ports::{HttpResponse, TransportError};
    use serde_json::json;

    fn setup() -> (ApiGateway, MockTransport, Arc<SessionContext>) {
        let transport = MockTransport::new();
        let session = Arc::new(SessionContext::new(Arc::new(InMemorySessionStore::new())));
        let gateway = ApiGateway::new(
            Arc::new(transport.clone()),
            session.clone(),
            ApiConfig {
                base_url: "http://api.test/api".to_string(),
                ..Default::default()
            },
        );
        (gateway, transport, session)
    }

    fn identity(id: i64) -> Identity {
        Identity::new(UserId::new(id), format!("u{}@example.com", id)).unwrap()
    }

    #[tokio::test]
    async fn json_success_is_parsed() {
        let (gateway, transport, _) = setup();
        transport.reply_json(Method::GET, "/api/trips", 200, json!([{"id": 1}]));

        let body = gateway.get("/trips").await.unwrap();

        assert_eq!(body, json!([{"id": 1}]));
        let call = transport.last_call(&Method::GET, "/api/trips").unwrap();
        assert_eq!(call.header("content-type"), Some("application/json"));
        assert_eq!(call.header("authorization"), None);
    }

    #[tokio::test]
    async fn no_content_is_empty_object() {
        let (gateway, transport, _) = setup();
        transport.reply(Method::DELETE, "/api/trips/3", HttpResponse::empty(204));

        let body = gateway.delete("/trips/3").await.unwrap();

        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn non_json_success_is_empty_object() {
        let (gateway, transport, _) = setup();
        transport.reply(
            Method::POST,
            "/api/logout",
            HttpResponse::new(200, Some("text/html".to_string()), "<p>bye</p>"),
        );

        assert_eq!(gateway.post("/logout", json!({})).await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn malformed_json_is_decode_error() {
        let (gateway, transport, _) = setup();
        transport.reply(
            Method::GET,
            "/api/profile",
            HttpResponse::new(200, Some("application/json".to_string()), "{not json"),
        );

        assert!(matches!(gateway.get("/profile").await, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn structured_error_keeps_code() {
        let (gateway, transport, _) = setup();
        transport.reply_json(
            Method::POST,
            "/api/login",
            403,
            json!({"error": "Verify your email first", "code": "EMAIL_NOT_VERIFIED"}),
        );

        let err = gateway.post("/login", json!({})).await.unwrap_err();

        assert!(err.is_unverified_email());
        assert_eq!(err.user_message(), "Verify your email first");
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        let (gateway, transport, _) = setup();
        transport.fail(Method::GET, "/api/trips", TransportError::Timeout);

        assert!(matches!(gateway.get("/trips").await, Err(ApiError::Network(_))));
    }

    #[tokio::test]
    async fn overlay_sends_bearer() {
        let (gateway, transport, session) = setup();
        session.sign_in(identity(1)).await;
        session
            .start_overlay(OverlayCredential::new("imp-1").unwrap(), identity(2))
            .await
            .unwrap();
        transport.reply_json(Method::GET, "/api/get-wardrobe", 200, json!({"items": []}));

        gateway.get("/get-wardrobe").await.unwrap();

        let call = transport.last_call(&Method::GET, "/api/get-wardrobe").unwrap();
        assert_eq!(call.header("authorization"), Some("Bearer imp-1"));
    }

    #[tokio::test]
    async fn unauthorized_expires_session() {
        let (gateway, transport, session) = setup();
        session.sign_in(identity(1)).await;
        transport.reply_json(Method::GET, "/api/trips", 401, json!({"error": "expired"}));

        let err = gateway.get("/trips").await.unwrap_err();

        assert_eq!(err, ApiError::session_expired());
        assert_eq!(session.principal().await, Principal::Anonymous);
    }

    #[tokio::test]
    async fn reported_unauthorized_leaves_session_alone() {
        let (gateway, transport, session) = setup();
        session.sign_in(identity(1)).await;
        transport.reply_json(Method::POST, "/api/login", 401, json!({"error": "Invalid credentials"}));

        let err = gateway
            .send(
                ApiCall::new(Method::POST, "/login")
                    .with_body(json!({}))
                    .reporting_unauthorized(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Invalid credentials");
        assert_eq!(session.principal().await, Principal::Authenticated(identity(1)));
    }
}
