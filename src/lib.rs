//! Wardrobe Sync - client-side state coherence for the wardrobe planner.
//!
//! This crate keeps a client's view of the wardrobe API consistent: who the
//! user is acting as (including an admin impersonation overlay), eleven
//! independently cached domains with a declared invalidation table, a push
//! channel for notifications, and bounded polling for slow server effects.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;

pub use application::{ClientError, DomainCacheStore, WardrobeClient};
pub use config::ClientConfig;
pub use domain::catalog::{DomainKind, MutationKind};
pub use domain::session::Principal;
pub use ports::ApiError;
