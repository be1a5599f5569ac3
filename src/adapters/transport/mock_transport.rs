//! Scripted HTTP transport for testing.
//!
//! Replies are registered per `(method, path)` and consumed in order; a
//! sticky reply answers once the queue is empty. Gated replies let a test
//! decide when, and in which order, in-flight requests complete.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.reply_json(Method::GET, "/trips", 200, json!([{"id": 1}]));
//! let gate = transport.gate(Method::GET, "/get-wardrobe");
//! // ... issue the fetch, then:
//! gate.release(HttpResponse::json(200, &json!({"items": []})));
//! ```

use async_trait::async_trait;
use http::Method;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::ports::{HttpRequest, HttpResponse, HttpTransport, TransportError};

type RouteKey = (Method, String);

enum MockReply {
    Respond(HttpResponse),
    Fail(TransportError),
    Gated(oneshot::Receiver<HttpResponse>),
}

#[derive(Default)]
struct Route {
    queue: VecDeque<MockReply>,
    sticky: Option<HttpResponse>,
}

/// Holds back one reply until released.
pub struct ReplyGate {
    sender: oneshot::Sender<HttpResponse>,
}

impl ReplyGate {
    /// Completes the gated request with `response`.
    pub fn release(self, response: HttpResponse) {
        let _ = self.sender.send(response);
    }
}

/// Mock HTTP transport.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<RouteKey, Route>>>,
    calls: Arc<Mutex<Vec<HttpRequest>>>,
}

/// Path component of an absolute or relative URL, without the query.
pub fn path_of(url: &str) -> &str {
    let without_scheme = match url.find("://") {
        Some(pos) => &url[pos + 3..],
        None => url,
    };
    let path = if url.contains("://") {
        without_scheme
            .find('/')
            .map(|pos| &without_scheme[pos..])
            .unwrap_or("/")
    } else {
        without_scheme
    };
    path.split('?').next().unwrap_or(path)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: MockReply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .queue
            .push_back(reply);
    }

    /// Queue one response.
    pub fn reply(&self, method: Method, path: &str, response: HttpResponse) {
        self.push(method, path, MockReply::Respond(response));
    }

    /// Queue one JSON response.
    pub fn reply_json(&self, method: Method, path: &str, status: u16, body: Value) {
        self.reply(method, path, HttpResponse::json(status, &body));
    }

    /// Answer every request on this route with `response` once the queue
    /// is exhausted.
    pub fn always(&self, method: Method, path: &str, response: HttpResponse) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .sticky = Some(response);
    }

    /// Shorthand for [`always`](Self::always) with a JSON body.
    pub fn always_json(&self, method: Method, path: &str, status: u16, body: Value) {
        self.always(method, path, HttpResponse::json(status, &body));
    }

    /// Queue a transport failure.
    pub fn fail(&self, method: Method, path: &str, error: TransportError) {
        self.push(method, path, MockReply::Fail(error));
    }

    /// Queue a reply that is held until the returned gate is released.
    pub fn gate(&self, method: Method, path: &str) -> ReplyGate {
        let (sender, receiver) = oneshot::channel();
        self.push(method, path, MockReply::Gated(receiver));
        ReplyGate { sender }
    }

    /// All requests seen so far.
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests seen for `(method, path)`.
    pub fn call_count(&self, method: &Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.method == method && path_of(&r.url) == path)
            .count()
    }

    /// The most recent request for `(method, path)`.
    pub fn last_call(&self, method: &Method, path: &str) -> Option<HttpRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| &r.method == method && path_of(&r.url) == path)
            .cloned()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn next_reply(&self, key: &RouteKey) -> Option<MockReply> {
        let mut routes = self.routes.lock().unwrap();
        let route = routes.get_mut(key)?;
        route
            .queue
            .pop_front()
            .or_else(|| route.sticky.clone().map(MockReply::Respond))
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = (request.method.clone(), path_of(&request.url).to_string());
        self.calls.lock().unwrap().push(request);

        match self.next_reply(&key) {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Fail(error)) => Err(error),
            Some(MockReply::Gated(receiver)) => receiver
                .await
                .map_err(|_| TransportError::Connect("gate dropped".to_string())),
            None => Ok(HttpResponse::json(
                404,
                &json!({"error": format!("no mock route for {} {}", key.0, key.1)}),
            )),
        }
    }
}
