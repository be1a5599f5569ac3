//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the client core to external systems:
//! - `transport` - HTTP and push transports (reqwest, SSE, mocks)
//! - `storage` - Session record stores (YAML files, in-memory)

pub mod storage;
pub mod transport;

pub use storage::{FileSessionStore, InMemorySessionStore};
pub use transport::{
    MockPushTransport, MockTransport, PushFeed, ReplyGate, ReqwestTransport, SsePushTransport,
};
