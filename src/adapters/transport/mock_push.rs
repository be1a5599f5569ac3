//! Scripted push transport for testing.
//!
//! Each call to [`MockPushTransport::queue_connection`] prepares one
//! connection and returns the [`PushFeed`] that drives it. `connect` fails
//! when nothing is queued, which exercises the reconnect path.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::ports::{HttpRequest, MessageStream, PushTransport, TransportError};

type Item = Result<String, TransportError>;

/// Sending half of one mock connection.
#[derive(Clone)]
pub struct PushFeed {
    sender: mpsc::UnboundedSender<Item>,
}

impl PushFeed {
    /// Deliver a raw message. Returns false once the consumer is gone.
    pub fn send(&self, message: impl Into<String>) -> bool {
        self.sender.send(Ok(message.into())).is_ok()
    }

    /// Deliver a stream error.
    pub fn fail(&self, error: TransportError) -> bool {
        self.sender.send(Err(error)).is_ok()
    }

    /// True once the consumer dropped the stream.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Mock push transport.
#[derive(Clone, Default)]
pub struct MockPushTransport {
    pending: Arc<Mutex<VecDeque<mpsc::UnboundedReceiver<Item>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockPushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare the next connection.
    pub fn queue_connection(&self) -> PushFeed {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.pending.lock().unwrap().push_back(receiver);
        PushFeed { sender }
    }

    /// Number of connection attempts, successful or not.
    pub fn connect_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for MockPushTransport {
    async fn connect(&self, request: HttpRequest) -> Result<MessageStream, TransportError> {
        self.requests.lock().unwrap().push(request);

        let receiver = self
            .pending
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Connect("no connection queued".to_string()))?;

        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|item| (item, receiver))
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[tokio::test]
    async fn connect_without_queue_fails() {
        let transport = MockPushTransport::new();
        let result = transport
            .connect(HttpRequest::new(Method::GET, "http://h/stream"))
            .await;
        assert!(result.is_err());
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn feed_drives_stream() {
        let transport = MockPushTransport::new();
        let feed = transport.queue_connection();
        let mut stream = transport
            .connect(HttpRequest::new(Method::GET, "http://h/stream"))
            .await
            .unwrap();

        assert!(feed.send("hello"));
        assert_eq!(stream.next().await, Some(Ok("hello".to_string())));

        drop(stream);
        assert!(feed.is_closed());
        assert!(!feed.send("late"));
    }
}
