//! HTTP Transport Port - One request in, one response out.
//!
//! The transport knows nothing about sessions or error classification.
//! It carries the ambient cookie credential itself and reports any
//! response it receives, whatever the status.

use async_trait::async_trait;
use http::Method;
use serde_json::Value;
use uuid::Uuid;

/// Outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Correlation id, logged by every layer that sees the request.
    pub id: Uuid,
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response as seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: Option<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    /// JSON response helper, mostly for tests.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, Some("application/json".to_string()), body.to_string())
    }

    /// Body-less response (e.g. 204).
    pub fn empty(status: u16) -> Self {
        Self::new(status, None, String::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false)
    }
}

/// Transport-level failure; no response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("stream error: {0}")]
    Stream(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Port for sending one HTTP request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request and return whatever response the server produced.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` only when no response was received.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = HttpRequest::new(Method::GET, "http://localhost/x")
            .with_header("Authorization", "Bearer t");
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert_eq!(request.header("cookie"), None);
    }

    #[test]
    fn json_response_is_detected() {
        let response = HttpResponse::json(200, &json!({"ok": true}));
        assert!(response.is_json());
        assert!(response.is_success());
    }

    #[test]
    fn content_type_with_charset_is_json() {
        let response = HttpResponse::new(
            200,
            Some("application/json; charset=utf-8".to_string()),
            "{}",
        );
        assert!(response.is_json());
    }

    #[test]
    fn empty_response_is_not_json() {
        let response = HttpResponse::empty(204);
        assert!(!response.is_json());
        assert!(response.is_success());
    }
}
