//! Durable session records.
//!
//! Two independently keyed records survive a reload:
//!
//! - `RememberedIdentity` - last known signed-in identity, used to paint the
//!   UI before the identity check resolves
//! - `PersistedOverlayBundle` - an in-progress admin overlay, restored
//!   verbatim and trusted without re-validation
//!
//! Only the session manager writes or clears either record.

use serde::{Deserialize, Serialize};

use super::principal::{Identity, OverlayCredential, Principal};

/// Last identity seen signed in on this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RememberedIdentity(pub Identity);

/// Persisted shape of an active overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedOverlayBundle {
    pub is_impersonating: bool,
    pub overlay_credential: String,
    pub original_identity: Identity,
    pub impersonated_identity: Identity,
}

impl PersistedOverlayBundle {
    /// Captures the bundle for an overlay principal.
    pub fn from_principal(principal: &Principal) -> Option<Self> {
        match principal {
            Principal::Overlay {
                identity,
                original,
                credential,
            } => Some(Self {
                is_impersonating: true,
                overlay_credential: credential.expose().to_string(),
                original_identity: original.clone(),
                impersonated_identity: identity.clone(),
            }),
            _ => None,
        }
    }

    /// Rebuilds the overlay principal.
    ///
    /// Returns `None` for a bundle that is flagged inactive or whose
    /// credential is blank; such a bundle is treated as absent.
    pub fn into_principal(self) -> Option<Principal> {
        if !self.is_impersonating {
            return None;
        }
        let credential = OverlayCredential::new(self.overlay_credential).ok()?;
        Some(Principal::Overlay {
            identity: self.impersonated_identity,
            original: self.original_identity,
            credential,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    fn overlay() -> Principal {
        Principal::Overlay {
            identity: Identity::new(UserId::new(9), "member@example.com").unwrap(),
            original: Identity::new(UserId::new(1), "admin@example.com").unwrap(),
            credential: OverlayCredential::new("tok-9").unwrap(),
        }
    }

    #[test]
    fn bundle_restores_the_same_principal() {
        let bundle = PersistedOverlayBundle::from_principal(&overlay()).unwrap();
        assert!(bundle.is_impersonating);
        assert_eq!(bundle.into_principal(), Some(overlay()));
    }

    #[test]
    fn non_overlay_principals_have_no_bundle() {
        assert!(PersistedOverlayBundle::from_principal(&Principal::Anonymous).is_none());
    }

    #[test]
    fn inactive_bundle_is_ignored() {
        let mut bundle = PersistedOverlayBundle::from_principal(&overlay()).unwrap();
        bundle.is_impersonating = false;
        assert!(bundle.into_principal().is_none());
    }

    #[test]
    fn remembered_identity_uses_wire_field_names() {
        let remembered =
            RememberedIdentity(Identity::new(UserId::new(3), "a@example.com").unwrap());
        let json = serde_json::to_value(&remembered).unwrap();
        assert_eq!(json, serde_json::json!({"id": 3, "email": "a@example.com"}));
    }
}
