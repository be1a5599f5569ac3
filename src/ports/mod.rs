//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the client core and the outside world. Adapters implement these ports.
//!
//! ## Network Ports
//!
//! - `HttpTransport` - One JSON request/response exchange
//! - `PushTransport` - Long-lived server push stream
//! - `ReadinessProbe` - One observation for convergence polling
//!
//! ## Session Ports
//!
//! - `SessionStore` - Durable remembered-identity and overlay records
//! - `SessionListener` - Observers of principal changes

mod api_error;
mod http_transport;
mod push_transport;
mod readiness_probe;
mod session_listener;
mod session_store;

pub use api_error::{
    ApiError, OVERLAY_EXPIRED_MESSAGE, SESSION_EXPIRED_MESSAGE, UNVERIFIED_EMAIL_CODE,
};
pub use http_transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
pub use push_transport::{MessageStream, PushTransport};
pub use readiness_probe::ReadinessProbe;
pub use session_listener::SessionListener;
pub use session_store::{SessionStore, SessionStoreError};
