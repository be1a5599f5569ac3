//! Sync domain - lifecycle state of the push channel and the poller.

mod channel_state;
mod poll_state;

pub use channel_state::ChannelState;
pub use poll_state::{ConvergencePollState, PollStatus, ProbeStatus};
