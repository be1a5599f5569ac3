//! Push channel lifecycle.
//!
//! ```text
//! Connecting -> Open -> (Error -> Reconnecting -> Open)* -> Closed
//! ```
//!
//! `Closed` is only reached by explicit teardown, which is allowed from any
//! live state. An `Error` never closes the channel on its own.

use crate::domain::foundation::StateMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Error,
    Reconnecting,
    Closed,
}

impl StateMachine for ChannelState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ChannelState::*;
        matches!(
            (self, target),
            (Connecting, Open)
                | (Connecting, Error)
                | (Open, Error)
                | (Error, Reconnecting)
                | (Reconnecting, Open)
                | (Reconnecting, Error)
                | (Connecting, Closed)
                | (Open, Closed)
                | (Error, Closed)
                | (Reconnecting, Closed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ChannelState::*;
        match self {
            Connecting => vec![Open, Error, Closed],
            Open => vec![Error, Closed],
            Error => vec![Reconnecting, Closed],
            Reconnecting => vec![Open, Error, Closed],
            Closed => vec![],
        }
    }
}

impl ChannelState {
    /// True while messages may still be applied.
    pub fn is_live(&self) -> bool {
        !matches!(self, ChannelState::Closed)
    }
}
