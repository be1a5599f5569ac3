//! Session Listener Port - Observers of principal changes.

use async_trait::async_trait;

use crate::domain::session::SessionEvent;

/// Receives session events after the principal has been replaced.
///
/// Listeners are invoked sequentially in registration order, without the
/// session lock held.
#[async_trait]
pub trait SessionListener: Send + Sync {
    async fn on_session_event(&self, event: &SessionEvent);
}
