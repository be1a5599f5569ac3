//! Network transports: reqwest for production, scripted mocks for tests.

mod mock_push;
mod mock_transport;
mod reqwest_transport;
mod sse;

pub use mock_push::{MockPushTransport, PushFeed};
pub use mock_transport::{path_of, MockTransport, ReplyGate};
pub use reqwest_transport::{ReqwestTransport, SsePushTransport};
pub use sse::SseDecoder;
