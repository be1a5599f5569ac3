//! Principal - the identity context used for every authorization decision.
//!
//! Modelled as a tagged union so that an overlay always carries both the
//! impersonation credential and the identity to return to. There is no way
//! to construct an `Overlay` without them, and no other variant holds them.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{UserId, ValidationError};

/// A signed-in account as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-side user key.
    #[serde(rename = "id")]
    pub user_id: UserId,

    /// Account email, shown in the impersonation banner.
    pub email: String,
}

impl Identity {
    /// Creates an identity, rejecting a blank email.
    pub fn new(user_id: UserId, email: impl Into<String>) -> Result<Self, ValidationError> {
        let email = email.into();
        if email.trim().is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        Ok(Self { user_id, email })
    }
}

/// Bearer token issued to an administrator for acting as another user.
#[derive(Clone)]
pub struct OverlayCredential(SecretString);

impl OverlayCredential {
    /// Wraps a raw impersonation token.
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ValidationError::empty_field("impersonation_token"));
        }
        Ok(Self(SecretString::new(token)))
    }

    /// Exposes the raw token, only for building headers and persistence.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Formats the `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }
}

impl fmt::Debug for OverlayCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OverlayCredential([REDACTED])")
    }
}

impl PartialEq for OverlayCredential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for OverlayCredential {}

/// The active principal.
///
/// Replaced wholesale on login, logout and overlay start/stop; never
/// partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Principal {
    /// No one is signed in.
    #[default]
    Anonymous,

    /// A user signed in through the ambient cookie session.
    Authenticated(Identity),

    /// An administrator acting as `identity` with a bearer credential.
    Overlay {
        identity: Identity,
        original: Identity,
        credential: OverlayCredential,
    },
}

impl Principal {
    /// Starts an overlay on top of an authenticated principal.
    ///
    /// Fails when there is no signed-in identity to return to, or when an
    /// overlay is already active.
    pub fn overlay(
        &self,
        target: Identity,
        credential: OverlayCredential,
    ) -> Result<Principal, ValidationError> {
        match self {
            Principal::Authenticated(original) => Ok(Principal::Overlay {
                identity: target,
                original: original.clone(),
                credential,
            }),
            other => Err(ValidationError::invalid_transition(other.kind(), "Overlay")),
        }
    }

    /// The identity requests are made as, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Principal::Anonymous => None,
            Principal::Authenticated(identity) => Some(identity),
            Principal::Overlay { identity, .. } => Some(identity),
        }
    }

    /// The administrator identity captured when the overlay started.
    pub fn original_identity(&self) -> Option<&Identity> {
        match self {
            Principal::Overlay { original, .. } => Some(original),
            _ => None,
        }
    }

    /// The overlay bearer credential, only present in `Overlay`.
    pub fn credential(&self) -> Option<&OverlayCredential> {
        match self {
            Principal::Overlay { credential, .. } => Some(credential),
            _ => None,
        }
    }

    pub fn is_overlay(&self) -> bool {
        matches!(self, Principal::Overlay { .. })
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    /// Short variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Principal::Anonymous => "Anonymous",
            Principal::Authenticated(_) => "Authenticated",
            Principal::Overlay { .. } => "Overlay",
        }
    }
}
