//! Convergence poll state.

use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::foundation::StateMachine;

/// What a single probe observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Pending,
    Ready,
}

/// Overall poll status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Pending,
    Ready,
    TimedOut,
}

impl StateMachine for PollStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (PollStatus::Pending, PollStatus::Ready) | (PollStatus::Pending, PollStatus::TimedOut)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            PollStatus::Pending => vec![PollStatus::Ready, PollStatus::TimedOut],
            PollStatus::Ready | PollStatus::TimedOut => vec![],
        }
    }
}

/// Transient state of one poll call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergencePollState {
    pub status: PollStatus,
    pub attempt_count: u32,
    pub started_at: Instant,
}

impl ConvergencePollState {
    pub fn start() -> Self {
        Self {
            status: PollStatus::Pending,
            attempt_count: 0,
            started_at: Instant::now(),
        }
    }

    /// Counts a probe and moves to `Ready` if it reported ready.
    pub fn record_probe(&mut self, observed: ProbeStatus) {
        if self.status != PollStatus::Pending {
            return;
        }
        self.attempt_count += 1;
        if observed == ProbeStatus::Ready {
            self.status = PollStatus::Ready;
        }
    }

    /// Moves to `TimedOut`; ignored once the poll has settled.
    pub fn time_out(&mut self) {
        if let Ok(next) = self.status.transition_to(PollStatus::TimedOut) {
            self.status = next;
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }
}
