//! Session context - the single owner of the active principal.
//!
//! Every principal change goes through here: it bumps the session
//! generation, persists the matching records, and then notifies the
//! registered listeners. In-flight work captures the generation when it is
//! issued and drops its result if the generation has moved on.

use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::foundation::ValidationError;
use crate::domain::session::{
    Identity, OverlayCredential, OverlayEndReason, PersistedOverlayBundle, Principal,
    RememberedIdentity, SessionEvent,
};
use crate::ports::{
    ApiError, SessionListener, SessionStore, OVERLAY_EXPIRED_MESSAGE, SESSION_EXPIRED_MESSAGE,
};

#[derive(Debug, Default)]
struct SessionState {
    principal: Principal,
    generation: u64,
    message: Option<String>,
}

/// Credentials and generation captured together when a request is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub header: Option<String>,
    pub generation: u64,
    pub is_overlay: bool,
}

/// Shared session state.
pub struct SessionContext {
    state: RwLock<SessionState>,
    store: Arc<dyn SessionStore>,
    listeners: RwLock<Vec<Weak<dyn SessionListener>>>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            store,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Registers a listener. Only a weak reference is kept, so a listener
    /// that is dropped elsewhere silently stops receiving events.
    pub async fn subscribe<L: SessionListener + 'static>(&self, listener: &Arc<L>) {
        let weak: Weak<dyn SessionListener> = Arc::downgrade(listener) as Weak<dyn SessionListener>;
        self.listeners.write().await.push(weak);
    }

    pub async fn principal(&self) -> Principal {
        self.state.read().await.principal.clone()
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// The overlay bearer header, or `None` when the ambient cookie applies.
    pub async fn current_auth_header(&self) -> Option<String> {
        self.state
            .read()
            .await
            .principal
            .credential()
            .map(OverlayCredential::bearer)
    }

    pub async fn auth_snapshot(&self) -> AuthSnapshot {
        let state = self.state.read().await;
        AuthSnapshot {
            header: state.principal.credential().map(OverlayCredential::bearer),
            generation: state.generation,
            is_overlay: state.principal.is_overlay(),
        }
    }

    /// Transient message for the UI, e.g. after an expiry.
    pub async fn session_message(&self) -> Option<String> {
        self.state.read().await.message.clone()
    }

    pub async fn clear_session_message(&self) {
        self.state.write().await.message = None;
    }

    /// Installs a principal recovered at bootstrap. Nothing is persisted
    /// and no event is sent.
    pub(crate) async fn restore(&self, principal: Principal) {
        let mut state = self.state.write().await;
        state.generation += 1;
        debug!(principal = principal.kind(), generation = state.generation, "Session restored");
        state.principal = principal;
    }

    /// Replaces the principal with a signed-in identity.
    pub async fn sign_in(&self, identity: Identity) -> Principal {
        let principal = Principal::Authenticated(identity.clone());
        let replaced = {
            let mut state = self.state.write().await;
            let replaced = state.principal.identity().cloned();
            state.generation += 1;
            state.principal = principal.clone();
            state.message = None;
            self.persist_remembered(Some(&identity)).await;
            self.persist_overlay(None).await;
            info!(user_id = %identity.user_id, generation = state.generation, "Signed in");
            replaced
        };
        self.notify(SessionEvent::SignedIn { identity, replaced }).await;
        principal
    }

    /// Resets to `Anonymous` and clears both persisted records.
    pub async fn sign_out(&self) {
        {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.principal = Principal::Anonymous;
            self.persist_remembered(None).await;
            self.persist_overlay(None).await;
            info!(generation = state.generation, "Signed out");
        }
        self.notify(SessionEvent::SignedOut).await;
    }

    /// Resolves to `Anonymous` after an identity check said so, without
    /// raising an expiry message or an event.
    pub(crate) async fn settle_anonymous(&self, forget_remembered: bool) {
        let mut state = self.state.write().await;
        if !state.principal.is_anonymous() {
            state.generation += 1;
            state.principal = Principal::Anonymous;
        }
        if forget_remembered {
            self.persist_remembered(None).await;
        }
    }

    /// Switches to acting as `target`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidTransition` unless the current
    /// principal is `Authenticated`.
    pub async fn start_overlay(
        &self,
        credential: OverlayCredential,
        target: Identity,
    ) -> Result<Principal, ValidationError> {
        let event = {
            let mut state = self.state.write().await;
            let next = state.principal.overlay(target.clone(), credential)?;
            let original = next
                .original_identity()
                .cloned()
                .ok_or_else(|| ValidationError::invalid_transition("Overlay", "Overlay"))?;

            state.generation += 1;
            self.persist_overlay(PersistedOverlayBundle::from_principal(&next).as_ref())
                .await;
            state.principal = next;
            info!(
                original = %original.user_id,
                target = %target.user_id,
                generation = state.generation,
                "Overlay started"
            );
            SessionEvent::OverlayStarted { original, target }
        };
        self.notify(event).await;
        Ok(self.principal().await)
    }

    /// Restores the identity captured when the overlay started.
    ///
    /// Returns the restored identity, or `None` if no overlay was active.
    pub async fn stop_overlay(&self, reason: OverlayEndReason) -> Option<Identity> {
        let restored = {
            let mut state = self.state.write().await;
            self.end_overlay_locked(&mut state, reason).await?
        };
        self.notify(SessionEvent::OverlayStopped {
            restored: restored.clone(),
            reason,
        })
        .await;
        Some(restored)
    }

    async fn end_overlay_locked(
        &self,
        state: &mut SessionState,
        reason: OverlayEndReason,
    ) -> Option<Identity> {
        let original = state.principal.original_identity()?.clone();
        state.generation += 1;
        state.principal = Principal::Authenticated(original.clone());
        if reason == OverlayEndReason::Expired {
            state.message = Some(OVERLAY_EXPIRED_MESSAGE.to_string());
        }
        self.persist_overlay(None).await;
        info!(
            restored = %original.user_id,
            ?reason,
            generation = state.generation,
            "Overlay stopped"
        );
        Some(original)
    }

    /// Applies the 401 policy for a request issued under `issued`.
    ///
    /// Inside an overlay the overlay ends (once, however many requests
    /// fail); otherwise the session expires. A 401 for a request issued
    /// under an older generation changes nothing.
    pub async fn handle_unauthorized(&self, issued: &AuthSnapshot) -> ApiError {
        let error = if issued.is_overlay {
            ApiError::overlay_expired()
        } else {
            ApiError::session_expired()
        };

        let event = {
            let mut state = self.state.write().await;
            if state.generation != issued.generation {
                debug!(
                    issued = issued.generation,
                    current = state.generation,
                    "Ignoring 401 from a superseded session"
                );
                return error;
            }

            if state.principal.is_overlay() {
                warn!("Overlay credential rejected, ending overlay");
                self.end_overlay_locked(&mut state, OverlayEndReason::Expired)
                    .await
                    .map(|restored| SessionEvent::OverlayStopped {
                        restored,
                        reason: OverlayEndReason::Expired,
                    })
            } else {
                warn!(principal = state.principal.kind(), "Session rejected, signing out");
                state.message = Some(SESSION_EXPIRED_MESSAGE.to_string());
                self.persist_remembered(None).await;
                if state.principal.is_anonymous() {
                    None
                } else {
                    state.generation += 1;
                    state.principal = Principal::Anonymous;
                    Some(SessionEvent::Expired)
                }
            }
        };

        if let Some(event) = event {
            self.notify(event).await;
        }
        error
    }

    async fn persist_remembered(&self, identity: Option<&Identity>) {
        let result = match identity {
            Some(identity) => {
                self.store
                    .save_remembered(&RememberedIdentity(identity.clone()))
                    .await
            }
            None => self.store.clear_remembered().await,
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist remembered identity");
        }
    }

    async fn persist_overlay(&self, bundle: Option<&PersistedOverlayBundle>) {
        let result = match bundle {
            Some(bundle) => self.store.save_overlay(bundle).await,
            None => self.store.clear_overlay().await,
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist overlay bundle");
        }
    }

    async fn notify(&self, event: SessionEvent) {
        // Upgrade before awaiting so the listener lock is not held across
        // listener callbacks.
        let listeners: Vec<Arc<dyn SessionListener>> = {
            let mut guard = self.listeners.write().await;
            guard.retain(|l| l.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };

        debug!(event = event.name(), listeners = listeners.len(), "Session event");
        for listener in listeners {
            listener.on_session_event(&event).await;
        }
    }
}
