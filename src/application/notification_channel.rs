//! Notification push channel.
//!
//! One long-lived push connection per session. Each inbound message is
//! placed first in the notification list straight away, then the list is
//! refetched shortly afterwards so the server's ordering and read state
//! win. Both signals are kept; nothing is deduplicated by id.
//!
//! ## Lifecycle
//!
//! | Event | Transition |
//! |---|---|
//! | connection established | `Connecting`/`Reconnecting` -> `Open` |
//! | connect failure, stream error or end | -> `Error` |
//! | backoff elapsed | `Error` -> `Reconnecting` |
//! | [`NotificationChannel::close`] | any -> `Closed` |
//!
//! Message handling and `close` share one gate, so once `close` returns no
//! message or refetch can touch the store.
//!
//! [`ChannelSupervisor`] ties the channel to the session: it reopens the
//! channel whenever the principal changes to a signed-in one and closes it on
//! sign-out or expiry. Session events only enqueue work; a single supervisor
//! task opens and closes channels in order.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use super::cache_store::DomainCacheStore;
use super::session_context::SessionContext;
use crate::config::{ApiConfig, NotificationsConfig};
use crate::domain::catalog::{DomainKind, Notification};
use crate::domain::foundation::StateMachine;
use crate::domain::session::SessionEvent;
use crate::domain::sync::ChannelState;
use crate::ports::{HttpRequest, MessageStream, PushTransport, SessionListener};

enum StreamEnd {
    Shutdown,
    Broken(String),
}

struct ChannelInner {
    transport: Arc<dyn PushTransport>,
    store: Arc<DomainCacheStore>,
    session: Arc<SessionContext>,
    config: NotificationsConfig,
    stream_url: String,
    state: watch::Sender<ChannelState>,
    last_activity: watch::Sender<Option<Instant>>,
    gate: Mutex<()>,
    closed: AtomicBool,
}

/// Handle to a running push channel.
pub struct NotificationChannel {
    inner: Arc<ChannelInner>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationChannel {
    /// Starts connecting in the background and returns at once.
    pub fn open(
        transport: Arc<dyn PushTransport>,
        store: Arc<DomainCacheStore>,
        session: Arc<SessionContext>,
        api: &ApiConfig,
        config: NotificationsConfig,
    ) -> Self {
        let (state, _) = watch::channel(ChannelState::Connecting);
        let (last_activity, _) = watch::channel(None);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(ChannelInner {
            transport,
            store,
            session,
            stream_url: api.url(&config.stream_path),
            config,
            state,
            last_activity,
            gate: Mutex::new(()),
            closed: AtomicBool::new(false),
        });

        info!(url = %inner.stream_url, "Opening notification channel");
        let task = tokio::spawn(inner.clone().run(shutdown_rx));

        Self {
            inner,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.inner.state.subscribe()
    }

    /// True for `activity_pulse_ms` after a message arrived.
    pub fn has_recent_activity(&self) -> bool {
        self.inner
            .last_activity
            .borrow()
            .map(|at| at.elapsed() < self.inner.config.activity_pulse())
            .unwrap_or(false)
    }

    /// Receiver that changes whenever a message arrives.
    pub fn activity(&self) -> watch::Receiver<Option<Instant>> {
        self.inner.last_activity.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Tears the channel down. Idempotent.
    ///
    /// Waits for a message or refetch already being applied, then stops the
    /// connection task. Nothing reaches the store afterwards.
    pub async fn close(&self) {
        {
            let _gate = self.inner.gate.lock().await;
            if self.inner.closed.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
        self.inner.transition(ChannelState::Closed);
        info!("Notification channel closed");
    }
}

impl ChannelInner {
    fn transition(&self, target: ChannelState) {
        self.state.send_if_modified(|state| match state.transition_to(target) {
            Ok(next) => {
                debug!(from = ?*state, to = ?next, "Notification channel state");
                *state = next;
                true
            }
            Err(_) => false,
        });
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = self.config.reconnect_delay();

        loop {
            let mut request = HttpRequest::new(http::Method::GET, self.stream_url.clone());
            if let Some(header) = self.session.current_auth_header().await {
                request = request.with_header("Authorization", header);
            }

            let connected = tokio::select! {
                _ = shutdown.changed() => return,
                result = self.transport.connect(request) => result,
            };

            match connected {
                Ok(stream) => {
                    self.transition(ChannelState::Open);
                    backoff = self.config.reconnect_delay();
                    match self.pump(stream, &mut shutdown).await {
                        StreamEnd::Shutdown => return,
                        StreamEnd::Broken(reason) => {
                            warn!(reason = %reason, "Notification stream interrupted")
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Notification channel failed to connect"),
            }

            self.transition(ChannelState::Error);
            debug!(delay_ms = backoff.as_millis() as u64, "Reconnecting notification channel");
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = time::sleep(backoff) => {}
            }
            backoff = next_backoff(backoff, self.config.max_reconnect_delay());
            self.transition(ChannelState::Reconnecting);
        }
    }

    async fn pump(&self, mut stream: MessageStream, shutdown: &mut watch::Receiver<bool>) -> StreamEnd {
        let mut refetch_at: Option<Instant> = None;

        let end = loop {
            let refetch_due = async move {
                match refetch_at {
                    Some(at) => time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                _ = shutdown.changed() => break StreamEnd::Shutdown,
                _ = refetch_due => {
                    refetch_at = None;
                    self.refetch().await;
                }
                item = stream.next() => match item {
                    Some(Ok(payload)) => {
                        if self.deliver(&payload).await {
                            refetch_at = Some(Instant::now() + self.config.refetch_delay());
                        }
                    }
                    Some(Err(e)) => break StreamEnd::Broken(e.to_string()),
                    None => break StreamEnd::Broken("stream ended".to_string()),
                },
            }
        };

        if matches!(end, StreamEnd::Broken(_)) && refetch_at.is_some() {
            self.refetch().await;
        }
        end
    }

    /// Applies one message. Returns true if it was a notification.
    async fn deliver(&self, payload: &str) -> bool {
        let _gate = self.gate.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }

        let notification: Notification = match serde_json::from_str(payload) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed notification message");
                return false;
            }
        };

        debug!(notification_id = %notification.id, "Notification pushed");
        if let Err(e) = self.store.push_notification(notification).await {
            warn!(error = %e, "Pushed notification could not be stored");
            return false;
        }
        self.last_activity.send_replace(Some(Instant::now()));
        true
    }

    async fn refetch(&self) {
        let _gate = self.gate.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.store.fetch(DomainKind::Notifications).await {
            warn!(error = %e, "Notification refetch failed");
        }
    }
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

enum Command {
    Open,
    Close,
    Sync(oneshot::Sender<()>),
}

/// Session-scoped owner of the notification channel.
pub struct ChannelSupervisor {
    commands: mpsc::UnboundedSender<Command>,
    current: Arc<RwLock<Option<Arc<NotificationChannel>>>>,
}

impl ChannelSupervisor {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        store: Arc<DomainCacheStore>,
        session: Arc<SessionContext>,
        api: ApiConfig,
        config: NotificationsConfig,
    ) -> Self {
        let (commands, mut receiver) = mpsc::unbounded_channel();
        let current: Arc<RwLock<Option<Arc<NotificationChannel>>>> = Arc::new(RwLock::new(None));
        let slot = current.clone();

        tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                match command {
                    Command::Open => {
                        let previous = slot.write().await.take();
                        if let Some(previous) = previous {
                            previous.close().await;
                        }
                        let channel = NotificationChannel::open(
                            transport.clone(),
                            store.clone(),
                            session.clone(),
                            &api,
                            config.clone(),
                        );
                        *slot.write().await = Some(Arc::new(channel));
                    }
                    Command::Close => {
                        let previous = slot.write().await.take();
                        if let Some(previous) = previous {
                            previous.close().await;
                        }
                    }
                    Command::Sync(done) => {
                        let _ = done.send(());
                    }
                }
            }
            let previous = slot.write().await.take();
            if let Some(previous) = previous {
                previous.close().await;
            }
        });

        Self { commands, current }
    }

    /// Replaces the current channel with a fresh connection.
    pub fn open(&self) {
        let _ = self.commands.send(Command::Open);
    }

    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Waits until every open/close requested so far has been carried out.
    pub async fn settled(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(Command::Sync(done)).is_ok() {
            let _ = wait.await;
        }
    }

    pub async fn channel(&self) -> Option<Arc<NotificationChannel>> {
        self.current.read().await.clone()
    }

    pub async fn state(&self) -> ChannelState {
        match self.channel().await {
            Some(channel) => channel.state(),
            None => ChannelState::Closed,
        }
    }
}

#[async_trait]
impl SessionListener for ChannelSupervisor {
    async fn on_session_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::SignedIn { .. }
            | SessionEvent::OverlayStarted { .. }
            | SessionEvent::OverlayStopped { .. } => self.open(),
            SessionEvent::SignedOut | SessionEvent::Expired => self.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySessionStore, MockPushTransport, MockTransport};
    use crate::application::gateway::ApiGateway;
    use crate::domain::foundation::UserId;
    use crate::domain::session::Identity;
    use crate::ports::TransportError;
    use http::Method;
    use serde_json::json;

    struct Harness {
        channel: NotificationChannel,
        push: MockPushTransport,
        http: MockTransport,
        store: Arc<DomainCacheStore>,
    }

    fn api() -> ApiConfig {
        ApiConfig {
            base_url: "http://api.test".to_string(),
            ..Default::default()
        }
    }

    async fn open(push: MockPushTransport) -> Harness {
        let http = MockTransport::new();
        let session = Arc::new(SessionContext::new(Arc::new(InMemorySessionStore::new())));
        session
            .sign_in(Identity::new(UserId::new(1), "me@example.com").unwrap())
            .await;
        let gateway = Arc::new(ApiGateway::new(Arc::new(http.clone()), session.clone(), api()));
        let store = Arc::new(DomainCacheStore::new(gateway));
        let channel = NotificationChannel::open(
            Arc::new(push.clone()),
            store.clone(),
            session,
            &api(),
            NotificationsConfig::default(),
        );
        Harness {
            channel,
            push,
            http,
            store,
        }
    }

    fn message(id: i64) -> String {
        json!({"id": id, "message": "Laundry day", "is_read": false, "created_at": "2026-03-01T08:00:00"})
            .to_string()
    }

    async fn settle() {
        time::sleep(Duration::from_millis(1)).await;
    }

    #[test]
    fn backoff_doubles_up_to_max() {
        let max = Duration::from_secs(30);
        assert_eq!(next_backoff(Duration::from_secs(1), max), Duration::from_secs(2));
        assert_eq!(next_backoff(Duration::from_secs(20), max), max);
    }

    #[tokio::test(start_paused = true)]
    async fn message_is_shown_then_refetched() {
        let push = MockPushTransport::new();
        let feed = push.queue_connection();
        let h = open(push).await;
        h.http.always_json(Method::GET, "/notifications", 200, json!([{"id": 9}, {"id": 1}]));
        settle().await;
        assert_eq!(h.channel.state(), ChannelState::Open);

        assert!(feed.send(message(1)));
        settle().await;

        assert_eq!(h.store.records(DomainKind::Notifications).await.len(), 1);
        assert!(h.channel.has_recent_activity());
        assert_eq!(h.http.call_count(&Method::GET, "/notifications"), 0);

        time::sleep(Duration::from_millis(600)).await;

        assert_eq!(h.http.call_count(&Method::GET, "/notifications"), 1);
        assert_eq!(h.store.records(DomainKind::Notifications).await.len(), 2);

        time::sleep(Duration::from_millis(600)).await;
        assert!(!h.channel.has_recent_activity());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_message_is_ignored() {
        let push = MockPushTransport::new();
        let feed = push.queue_connection();
        let h = open(push).await;
        settle().await;

        feed.send("not json");
        time::sleep(Duration::from_secs(1)).await;

        assert!(h.store.records(DomainKind::Notifications).await.is_empty());
        assert!(h.http.calls().is_empty());
        assert_eq!(h.channel.state(), ChannelState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_error_reconnects() {
        let push = MockPushTransport::new();
        let first = push.queue_connection();
        let second = push.queue_connection();
        let h = open(push).await;
        settle().await;

        first.fail(TransportError::Stream("reset by peer".to_string()));
        settle().await;
        assert_eq!(h.channel.state(), ChannelState::Error);

        time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(h.channel.state(), ChannelState::Open);
        assert_eq!(h.push.connect_count(), 2);
        assert!(second.send(message(4)));
        settle().await;
        assert_eq!(h.store.records(DomainKind::Notifications).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failure_never_closes() {
        let h = open(MockPushTransport::new()).await;

        time::sleep(Duration::from_secs(10)).await;

        assert!(h.channel.state().is_live());
        assert!(h.push.connect_count() >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_final() {
        let push = MockPushTransport::new();
        let feed = push.queue_connection();
        let h = open(push).await;
        settle().await;

        h.channel.close().await;
        h.channel.close().await;
        feed.send(message(1));
        time::sleep(Duration::from_secs(2)).await;

        assert_eq!(h.channel.state(), ChannelState::Closed);
        assert!(h.channel.is_closed());
        assert!(h.store.records(DomainKind::Notifications).await.is_empty());
        assert!(h.http.calls().is_empty());
        assert!(!h.channel.has_recent_activity());
    }

    #[tokio::test(start_paused = true)]
    async fn supervisor_follows_session_events() {
        let push = MockPushTransport::new();
        let first = push.queue_connection();
        let second = push.queue_connection();
        let h = open(MockPushTransport::new()).await;
        let session = Arc::new(SessionContext::new(Arc::new(InMemorySessionStore::new())));
        let supervisor = Arc::new(ChannelSupervisor::new(
            Arc::new(push.clone()),
            h.store.clone(),
            session.clone(),
            api(),
            NotificationsConfig::default(),
        ));
        session.subscribe(&supervisor).await;
        assert_eq!(supervisor.state().await, ChannelState::Closed);

        session
            .sign_in(Identity::new(UserId::new(1), "me@example.com").unwrap())
            .await;
        supervisor.settled().await;
        settle().await;
        assert_eq!(supervisor.state().await, ChannelState::Open);

        session.sign_out().await;
        supervisor.settled().await;
        settle().await;
        assert_eq!(supervisor.state().await, ChannelState::Closed);
        assert!(first.is_closed());
        assert_eq!(push.connect_count(), 1);

        session
            .sign_in(Identity::new(UserId::new(1), "me@example.com").unwrap())
            .await;
        supervisor.settled().await;
        settle().await;
        assert_eq!(supervisor.state().await, ChannelState::Open);
        assert!(second.send(message(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_refetch() {
        let push = MockPushTransport::new();
        let feed = push.queue_connection();
        let h = open(push).await;
        settle().await;
        feed.send(message(1));
        settle().await;

        h.channel.close().await;
        time::sleep(Duration::from_secs(2)).await;

        assert_eq!(h.http.call_count(&Method::GET, "/notifications"), 0);
    }
}
