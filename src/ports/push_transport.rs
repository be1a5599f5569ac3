//! Push Transport Port - Server-initiated message stream.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::http_transport::{HttpRequest, TransportError};

/// Stream of raw message payloads. The stream ends when the server
/// closes the connection; an `Err` item reports a broken connection.
pub type MessageStream = BoxStream<'static, Result<String, TransportError>>;

/// Port for opening a credentialed push connection.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Open the connection described by `request`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the connection cannot be established.
    async fn connect(&self, request: HttpRequest) -> Result<MessageStream, TransportError>;
}
