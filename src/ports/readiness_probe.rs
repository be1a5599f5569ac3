//! Readiness Probe Port - One observation of an asynchronous side effect.

use async_trait::async_trait;

use super::api_error::ApiError;
use crate::domain::sync::ProbeStatus;

/// Port probed by the convergence poller.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Observe the side effect once.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the observation itself failed. The poller
    /// treats that as still pending.
    async fn probe(&self) -> Result<ProbeStatus, ApiError>;
}
