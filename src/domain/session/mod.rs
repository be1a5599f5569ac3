//! Session domain - who the client is acting as.
//!
//! # Module Organization
//!
//! - `principal` - The active identity context, including the admin overlay
//! - `records` - Durable records that survive a reload
//! - `events` - Lifecycle notifications fanned out to session listeners

mod events;
mod principal;
mod records;

pub use events::{OverlayEndReason, SessionEvent};
pub use principal::{Identity, OverlayCredential, Principal};
pub use records::{PersistedOverlayBundle, RememberedIdentity};
