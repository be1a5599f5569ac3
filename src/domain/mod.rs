//! Domain layer containing the client's state types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machines)
//! - `session` - Principal, overlay and persisted session records
//! - `catalog` - Cached domains, records, collections and invalidation edges
//! - `sync` - Push channel and convergence poll lifecycles

pub mod catalog;
pub mod foundation;
pub mod session;
pub mod sync;
