//! reqwest-backed HTTP and push transports.
//!
//! Both transports share one cookie jar so the session cookie set by
//! `/login` also authenticates the push stream.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::sse::SseDecoder;
use crate::config::ApiConfig;
use crate::ports::{
    HttpRequest, HttpResponse, HttpTransport, MessageStream, PushTransport, TransportError,
};

const PUSH_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request/response transport over reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    /// Creates a transport with a fresh cookie jar.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidRequest` if the client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        Self::with_jar(config, Arc::new(Jar::default()))
    }

    /// Creates a transport that stores cookies in `jar`.
    pub fn with_jar(config: &ApiConfig, jar: Arc<Jar>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .cookie_provider(jar.clone())
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(Self { client, jar })
    }

    /// The jar holding the ambient session cookie.
    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }
}

fn to_reqwest_method(method: &http::Method) -> Result<reqwest::Method, TransportError> {
    reqwest::Method::from_bytes(method.as_str().as_bytes())
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connect(err.to_string())
    }
}

fn build(client: &Client, request: &HttpRequest) -> Result<reqwest::RequestBuilder, TransportError> {
    let mut builder = client.request(to_reqwest_method(&request.method)?, &request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &request.body {
        builder = builder.json(body);
    }
    Ok(builder)
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = build(&self.client, &request)?
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(classify)?;

        debug!(
            request_id = %request.id,
            method = %request.method,
            url = %request.url,
            status,
            "Response received"
        );

        Ok(HttpResponse::new(status, content_type, body))
    }
}

/// Server-sent-events push transport.
///
/// Uses its own client without an overall timeout, since the stream is
/// expected to stay open indefinitely.
#[derive(Debug, Clone)]
pub struct SsePushTransport {
    client: Client,
}

impl SsePushTransport {
    /// Creates a push transport sharing `jar` with the request transport.
    pub fn new(config: &ApiConfig, jar: Arc<Jar>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(PUSH_CONNECT_TIMEOUT)
            .user_agent(config.user_agent.clone())
            .cookie_provider(jar)
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PushTransport for SsePushTransport {
    async fn connect(&self, request: HttpRequest) -> Result<MessageStream, TransportError> {
        let response = build(&self.client, &request)?
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Connect(format!(
                "push endpoint answered {}",
                status.as_u16()
            )));
        }

        debug!(request_id = %request.id, url = %request.url, "Push stream open");

        let stream = response
            .bytes_stream()
            .scan(SseDecoder::new(), |decoder, chunk| {
                let items: Vec<Result<String, TransportError>> = match chunk {
                    Ok(bytes) => decoder.feed(&bytes).into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(TransportError::Stream(e.to_string()))],
                };
                futures::future::ready(Some(futures::stream::iter(items)))
            })
            .flatten();

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        ApiConfig {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 5,
            user_agent: "wardrobe-sync-test".to_string(),
        }
    }

    #[test]
    fn builds_with_shared_jar() {
        let transport = ReqwestTransport::new(&config()).unwrap();
        let push = SsePushTransport::new(&config(), transport.cookie_jar());
        assert!(push.is_ok());
    }

    #[test]
    fn every_http_method_converts() {
        for method in [
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ] {
            let converted = to_reqwest_method(&method).unwrap();
            assert_eq!(converted.as_str(), method.as_str());
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let transport = ReqwestTransport::new(&config()).unwrap();
        let request = HttpRequest::new(http::Method::GET, "http://127.0.0.1:9/unreachable");

        let result = transport.send(request).await;
        assert!(result.is_err());
    }
}
