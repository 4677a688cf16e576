use crate::domain::EngineEvent;
use async_trait::async_trait;

/// Publisher for engine events
///
/// Events are pushed to every live stream connection. This decouples the
/// command and simulation logic from the delivery mechanism.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to all subscribers, best effort.
    ///
    /// Returns the number of connections the event was handed to.
    async fn publish(&self, event: EngineEvent) -> usize;
}
