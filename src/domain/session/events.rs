//! Session lifecycle events.
//!
//! Delivered to every registered `SessionListener` after the principal has
//! been replaced, in registration order.

use super::principal::Identity;

/// Why an overlay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEndReason {
    /// The administrator exited the overlay.
    Manual,
    /// The API rejected the overlay credential.
    Expired,
}

/// A change of the active principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user signed in (login, register or a successful identity check).
    /// `replaced` is the identity that was active just before, if any.
    SignedIn {
        identity: Identity,
        replaced: Option<Identity>,
    },

    /// The user signed out explicitly.
    SignedOut,

    /// The API rejected the ambient session.
    Expired,

    /// An administrator started acting as `target`.
    OverlayStarted { original: Identity, target: Identity },

    /// The overlay ended and `restored` is active again.
    OverlayStopped {
        restored: Identity,
        reason: OverlayEndReason,
    },
}

impl SessionEvent {
    /// True when cached data belongs to a different principal afterwards.
    pub fn invalidates_cache(&self) -> bool {
        match self {
            SessionEvent::SignedIn { identity, replaced } => replaced
                .as_ref()
                .is_some_and(|previous| previous.user_id != identity.user_id),
            _ => true,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SignedIn { .. } => "signed_in",
            SessionEvent::SignedOut => "signed_out",
            SessionEvent::Expired => "expired",
            SessionEvent::OverlayStarted { .. } => "overlay_started",
            SessionEvent::OverlayStopped { .. } => "overlay_stopped",
        }
    }
}
