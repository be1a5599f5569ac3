//! Convergence polling.
//!
//! Bounded, interval-based probing for a server-side side effect that
//! completes asynchronously (e.g. a subscription activated by a payment
//! webhook). The first probe runs one interval after the start. Once the
//! timeout elapses no further probe is issued, and a probe still in flight
//! is abandoned. Timing out is not an error: the effect may simply be slow.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::gateway::ApiGateway;
use crate::domain::sync::{ConvergencePollState, PollStatus, ProbeStatus};
use crate::ports::{ApiError, ReadinessProbe};

/// How a poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A probe reported ready after `attempts` probes.
    Ready { attempts: u32 },
    /// The timeout elapsed first. The caller may offer a manual retry.
    TimedOut { attempts: u32 },
    /// The poll was torn down before it settled.
    Cancelled,
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }

    /// `ApiError::Timeout` for a poll that gave up after `timeout`, for
    /// callers that report it next to other errors.
    pub fn timeout_error(&self, timeout: Duration) -> Option<ApiError> {
        match self {
            PollOutcome::TimedOut { .. } => Some(ApiError::Timeout { waited: timeout }),
            _ => None,
        }
    }
}

/// Shortest probe interval. Anything below it is raised to it.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Probes `probe` every `interval` until it reports ready, `timeout`
/// elapses, or `shutdown` turns true.
pub async fn poll_until_ready(
    probe: &dyn ReadinessProbe,
    interval: Duration,
    timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> PollOutcome {
    let interval = interval.max(MIN_INTERVAL);
    let mut state = ConvergencePollState::start();
    let deadline = time::sleep(timeout);
    tokio::pin!(deadline);
    let mut ticks = time::interval_at(Instant::now() + interval, interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(interval_ms = interval.as_millis() as u64, timeout_ms = timeout.as_millis() as u64, "Polling started");

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => return PollOutcome::Cancelled,
            _ = &mut deadline => break,
            _ = ticks.tick() => {}
        }

        let observed = tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => return PollOutcome::Cancelled,
            _ = &mut deadline => break,
            result = probe.probe() => result,
        };

        match observed {
            Ok(status) => state.record_probe(status),
            Err(e) => {
                warn!(attempt = state.attempt_count + 1, error = %e, "Probe failed, still pending");
                state.record_probe(ProbeStatus::Pending);
            }
        }

        if state.status == PollStatus::Ready {
            info!(attempts = state.attempt_count, elapsed_ms = state.elapsed().as_millis() as u64, "Converged");
            return PollOutcome::Ready {
                attempts: state.attempt_count,
            };
        }
    }

    state.time_out();
    info!(attempts = state.attempt_count, "Polling timed out while still pending");
    PollOutcome::TimedOut {
        attempts: state.attempt_count,
    }
}

/// Resolves once `shutdown` is true. A dropped sender never cancels.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Handle to a poll running in the background. Dropping it cancels the poll.
pub struct PollHandle {
    shutdown: watch::Sender<bool>,
    cancelled: Arc<Mutex<bool>>,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    /// Stops probing and the timeout. The callback will not run afterwards.
    pub fn cancel(&self) {
        if let Ok(mut cancelled) = self.cancelled.lock() {
            *cancelled = true;
        }
        self.shutdown.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the outcome.
    pub async fn outcome(mut self) -> PollOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(PollOutcome::Cancelled),
            None => PollOutcome::Cancelled,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel();
        }
    }
}

/// Runs [`poll_until_ready`] in a task and hands a settled outcome
/// (`Ready` or `TimedOut`) to `on_settled` exactly once, unless cancelled.
pub fn spawn_poll<F>(
    probe: Arc<dyn ReadinessProbe>,
    interval: Duration,
    timeout: Duration,
    on_settled: F,
) -> PollHandle
where
    F: FnOnce(PollOutcome) + Send + 'static,
{
    let (shutdown, shutdown_rx) = watch::channel(false);
    let cancelled = Arc::new(Mutex::new(false));
    let flag = cancelled.clone();

    let task = tokio::spawn(async move {
        let outcome = poll_until_ready(probe.as_ref(), interval, timeout, shutdown_rx).await;
        if outcome == PollOutcome::Cancelled {
            return outcome;
        }
        match flag.lock() {
            Ok(cancelled) if !*cancelled => {
                on_settled(outcome);
                outcome
            }
            _ => PollOutcome::Cancelled,
        }
    });

    PollHandle {
        shutdown,
        cancelled,
        task: Some(task),
    }
}

#[derive(Deserialize)]
struct ProbeBody {
    status: ProbeStatus,
}

/// Probe backed by a `GET` returning `{"status": "pending" | "ready"}`.
pub struct GatewayProbe {
    gateway: Arc<ApiGateway>,
    path: String,
}

impl GatewayProbe {
    pub fn new(gateway: Arc<ApiGateway>, path: impl Into<String>) -> Self {
        Self {
            gateway,
            path: path.into(),
        }
    }
}

#[async_trait]
impl ReadinessProbe for GatewayProbe {
    async fn probe(&self) -> Result<ProbeStatus, ApiError> {
        let body = self.gateway.get(&self.path).await?;
        let parsed: ProbeBody =
            serde_json::from_value(body).map_err(|e| ApiError::decode(e.to_string()))?;
        Ok(parsed.status)
    }
}
