//! API error taxonomy.
//!
//! Every server interaction funnels into one of these variants. The
//! gateway raises them; callers decide between local recovery (inspect
//! [`ApiError::code`]) and global recovery (`Unauthorized`).

use serde_json::Value;
use std::time::Duration;

use super::http_transport::TransportError;

/// Code the server attaches when login is blocked on email verification.
pub const UNVERIFIED_EMAIL_CODE: &str = "EMAIL_NOT_VERIFIED";

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please login again.";
pub const OVERLAY_EXPIRED_MESSAGE: &str = "Impersonation session expired.";

/// Errors raised by the API gateway.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// 401 - the session or the overlay expired.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// True when the 401 ended an overlay rather than the session.
        overlay_expired: bool,
        message: String,
    },

    /// 4xx other than 401, with the structured error body.
    #[error("request rejected ({status}): {message}")]
    Validation {
        status: u16,
        message: String,
        code: Option<String>,
        payload: Value,
    },

    /// 5xx.
    #[error("server error ({status}): {message}")]
    Server {
        status: u16,
        message: String,
        payload: Value,
    },

    /// Convergence polling gave up waiting. Not fatal.
    #[error("still processing after {waited:?}")]
    Timeout { waited: Duration },

    /// A 2xx JSON body that could not be parsed.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates an unauthorized error for an expired session.
    pub fn session_expired() -> Self {
        Self::Unauthorized {
            overlay_expired: false,
            message: SESSION_EXPIRED_MESSAGE.to_string(),
        }
    }

    /// Creates an unauthorized error for an expired overlay.
    pub fn overlay_expired() -> Self {
        Self::Unauthorized {
            overlay_expired: true,
            message: OVERLAY_EXPIRED_MESSAGE.to_string(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Classifies a non-2xx, non-401 response.
    ///
    /// The body is parsed as `{error, code?}` when possible; anything
    /// else becomes a generic message and a `Null` payload.
    pub fn from_status(status: u16, body: &str) -> Self {
        let payload: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let message = payload
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("API Error: {}", status));

        if (400..500).contains(&status) {
            let code = payload
                .get("code")
                .and_then(Value::as_str)
                .map(str::to_string);
            Self::Validation {
                status,
                message,
                code,
                payload,
            }
        } else {
            Self::Server {
                status,
                message,
                payload,
            }
        }
    }

    /// Structured error code, when the server sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Validation { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Parsed error body, when there was one.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Validation { payload, .. } | Self::Server { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn is_unverified_email(&self) -> bool {
        self.code() == Some(UNVERIFIED_EMAIL_CODE)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// True for failures the caller may offer to continue past.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Short, non-blocking text for the UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Unable to reach the server. Check your connection.".to_string(),
            Self::Unauthorized { message, .. } => message.clone(),
            Self::Validation { message, .. } => message.clone(),
            Self::Server { .. } => "Something went wrong. Please try again.".to_string(),
            Self::Timeout { .. } => {
                "Still processing. You can continue and check back shortly.".to_string()
            }
            Self::Decode(_) => "Unexpected response from the server.".to_string(),
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        Self::Network(err.to_string())
    }
}
