//! Application layer - the client's stateful components.
//!
//! # Module Organization
//!
//! - `session_context` - The shared principal, its persistence and event fan-out
//! - `gateway` - Uniform API calls and response classification
//! - `session_manager` - Bootstrap, login, logout and the admin overlay
//! - `routes` - Fetch and mutation endpoints per domain
//! - `cache_store` - Per-domain collections, ordering guard and invalidation cascade
//! - `notification_channel` - Push connection and its session-scoped supervisor
//! - `convergence` - Bounded polling for asynchronous server effects
//! - `client` - The assembled `WardrobeClient`

pub mod cache_store;
pub mod client;
pub mod convergence;
pub mod gateway;
pub mod notification_channel;
pub mod routes;
pub mod session_context;
pub mod session_manager;

pub use cache_store::{DomainCacheStore, FetchOutcome, StoreError};
pub use client::{ClientError, WardrobeClient};
pub use convergence::{poll_until_ready, spawn_poll, GatewayProbe, PollHandle, PollOutcome};
pub use gateway::{ApiCall, ApiGateway, UnauthorizedPolicy};
pub use notification_channel::{ChannelSupervisor, NotificationChannel};
pub use routes::{crud_mutation, fetch_path, mutation_route, CrudOp, LocalEffect, MutationRoute, ResponseShape};
pub use session_context::{AuthSnapshot, SessionContext};
pub use session_manager::SessionManager;
