//! `WardrobeClient` - the assembled client.
//!
//! Wires the gateway, session manager, cache store, push channel and poller
//! around one shared [`SessionContext`]. The cache store and the channel
//! supervisor subscribe to session events, so every principal change resets
//! the cache and reconnects (or closes) the push channel.

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::cache_store::{DomainCacheStore, StoreError};
use super::convergence::{poll_until_ready, spawn_poll, GatewayProbe, PollHandle, PollOutcome};
use super::gateway::ApiGateway;
use super::notification_channel::{ChannelSupervisor, NotificationChannel};
use super::session_context::SessionContext;
use super::session_manager::SessionManager;
use crate::adapters::{FileSessionStore, InMemorySessionStore, ReqwestTransport, SsePushTransport};
use crate::config::{ClientConfig, ConfigError};
use crate::domain::foundation::ValidationError;
use crate::domain::session::{Identity, OverlayCredential, Principal};
use crate::domain::sync::ChannelState;
use crate::ports::{ApiError, HttpTransport, PushTransport, SessionStore, TransportError};

/// Errors surfaced by the facade.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid value: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Message suitable for a transient, non-blocking notice.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api(e) => e.user_message(),
            ClientError::Store(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImpersonationResponse {
    impersonation_token: String,
}

pub struct WardrobeClient {
    config: ClientConfig,
    gateway: Arc<ApiGateway>,
    sessions: SessionManager,
    store: Arc<DomainCacheStore>,
    channel: Arc<ChannelSupervisor>,
}

impl WardrobeClient {
    /// Assembles a client over the given transports and session store.
    pub async fn new(
        config: ClientConfig,
        http: Arc<dyn HttpTransport>,
        push: Arc<dyn PushTransport>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        let session = Arc::new(SessionContext::new(session_store));
        let gateway = Arc::new(ApiGateway::new(http, session.clone(), config.api.clone()));
        let store = Arc::new(DomainCacheStore::new(gateway.clone()));
        let channel = Arc::new(ChannelSupervisor::new(
            push,
            store.clone(),
            session.clone(),
            config.api.clone(),
            config.notifications.clone(),
        ));

        session.subscribe(&store).await;
        session.subscribe(&channel).await;

        Self {
            config,
            sessions: SessionManager::new(gateway.clone()),
            gateway,
            store,
            channel,
        }
    }

    /// Builds the production stack: `reqwest` transports sharing one cookie
    /// jar, and a YAML session store when `persistence.state_dir` is set.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` for an invalid configuration and
    /// `ClientError::Transport` if an HTTP client cannot be built.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate().map_err(ConfigError::from)?;

        let http = ReqwestTransport::new(&config.api)?;
        let push = SsePushTransport::new(&config.api, http.cookie_jar())?;
        let session_store: Arc<dyn SessionStore> = match &config.persistence.state_dir {
            Some(dir) => Arc::new(FileSessionStore::new(dir)),
            None => Arc::new(InMemorySessionStore::new()),
        };

        info!(base_url = %config.api.base_url, "Wardrobe client configured");
        Ok(Self::new(config, Arc::new(http), Arc::new(push), session_store).await)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<DomainCacheStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<ApiGateway> {
        &self.gateway
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    // ════════════════════════════════════════════════════════════════
    // Session
    // ════════════════════════════════════════════════════════════════

    /// Resolves the startup principal and connects the push channel for a
    /// signed-in one.
    pub async fn bootstrap(&self) -> Principal {
        let principal = self.sessions.bootstrap().await;
        self.channel.settled().await;
        // A restored overlay raises no event, so open explicitly.
        if !principal.is_anonymous() && self.channel.channel().await.is_none() {
            self.channel.open();
            self.channel.settled().await;
        }
        principal
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Principal, ClientError> {
        let principal = self.sessions.login(email, password).await?;
        self.channel.settled().await;
        Ok(principal)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        location: &str,
    ) -> Result<Principal, ClientError> {
        let principal = self.sessions.register(email, password, location).await?;
        self.channel.settled().await;
        Ok(principal)
    }

    /// Signs out. Always ends with an empty cache and a closed channel.
    pub async fn logout(&self) {
        self.sessions.logout().await;
        self.channel.settled().await;
    }

    /// Starts acting as `target` using a server-issued overlay credential.
    ///
    /// # Errors
    ///
    /// The API refuses to impersonate administrators and non-admins may
    /// not impersonate at all; both arrive as `ApiError::Validation`.
    pub async fn impersonate(&self, target: Identity) -> Result<Principal, ClientError> {
        let path = format!("/admin/users/{}/impersonate", target.user_id);
        let body = self.gateway.post(&path, json!({})).await?;
        let response: ImpersonationResponse =
            serde_json::from_value(body).map_err(|e| ApiError::decode(e.to_string()))?;
        let credential = OverlayCredential::new(response.impersonation_token)?;

        let principal = self.sessions.start_overlay(credential, target).await?;
        self.channel.settled().await;
        Ok(principal)
    }

    /// Ends the overlay and returns the restored identity.
    pub async fn stop_impersonating(&self) -> Option<Identity> {
        let restored = self.sessions.stop_overlay().await;
        self.channel.settled().await;
        restored
    }

    pub async fn principal(&self) -> Principal {
        self.sessions.principal().await
    }

    pub async fn session_message(&self) -> Option<String> {
        self.sessions.session_message().await
    }

    pub async fn clear_session_message(&self) {
        self.sessions.clear_session_message().await
    }

    // ════════════════════════════════════════════════════════════════
    // Push channel
    // ════════════════════════════════════════════════════════════════

    pub async fn channel_state(&self) -> ChannelState {
        self.channel.state().await
    }

    pub async fn notification_channel(&self) -> Option<Arc<NotificationChannel>> {
        self.channel.channel().await
    }

    pub async fn has_recent_activity(&self) -> bool {
        match self.channel.channel().await {
            Some(channel) => channel.has_recent_activity(),
            None => false,
        }
    }

    /// Closes the push channel and waits until it is gone.
    pub async fn shutdown(&self) {
        self.channel.close();
        self.channel.settled().await;
    }

    // ════════════════════════════════════════════════════════════════
    // Convergence
    // ════════════════════════════════════════════════════════════════

    fn activation_probe(&self) -> Arc<GatewayProbe> {
        Arc::new(GatewayProbe::new(
            self.gateway.clone(),
            self.config.polling.probe_path.clone(),
        ))
    }

    /// Waits for a subscription purchase to be reflected by the API, then
    /// refreshes the profile.
    ///
    /// `TimedOut` is not an error: the webhook may still arrive, and the
    /// caller can offer to check again.
    ///
    /// # Errors
    ///
    /// Only the profile refresh after `Ready` can fail.
    pub async fn await_subscription_activation(
        &self,
        cancel: watch::Receiver<bool>,
    ) -> Result<PollOutcome, ClientError> {
        let probe = self.activation_probe();
        let outcome = poll_until_ready(
            probe.as_ref(),
            self.config.polling.interval(),
            self.config.polling.timeout(),
            cancel,
        )
        .await;

        if outcome.is_ready() {
            self.store.fetch_profile().await?;
        }
        Ok(outcome)
    }

    /// Background variant of [`await_subscription_activation`] tied to the
    /// returned handle. Cancelling or dropping the handle stops the poll and suppresses
    /// `on_settled`; refreshing the profile on `Ready` is up to the callback.
    ///
    /// [`await_subscription_activation`]: Self::await_subscription_activation
    pub fn watch_subscription_activation<F>(&self, on_settled: F) -> PollHandle
    where
        F: FnOnce(PollOutcome) + Send + 'static,
    {
        spawn_poll(
            self.activation_probe(),
            self.config.polling.interval(),
            self.config.polling.timeout(),
            on_settled,
        )
    }
}
