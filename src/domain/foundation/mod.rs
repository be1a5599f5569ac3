//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, validation errors and the state
//! machine trait that the rest of the wardrobe domain is written in.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{RecordId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
