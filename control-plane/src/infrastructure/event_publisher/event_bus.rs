use super::ConnectionRegistry;
use crate::application::ports::EventPublisher;
use crate::domain::{Clock, EngineEvent};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Publishes engine events to every registered stream connection
///
/// Each event is stamped with the emission time in whole seconds and
/// serialized once; the same text frame goes to every connection.
pub struct EventBus<C: Clock> {
    registry: Arc<ConnectionRegistry>,
    clock: Arc<C>,
}

impl<C: Clock> EventBus<C> {
    pub fn new(registry: Arc<ConnectionRegistry>, clock: Arc<C>) -> Self {
        Self { registry, clock }
    }

    fn encode(&self, event: &EngineEvent) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(event)?;
        if let Value::Object(fields) = &mut value {
            fields.insert("timestamp".to_string(), Value::from(self.clock.now_secs()));
        }
        serde_json::to_string(&value)
    }
}

#[async_trait]
impl<C: Clock + 'static> EventPublisher for EventBus<C> {
    async fn publish(&self, event: EngineEvent) -> usize {
        let payload = match self.encode(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(kind = event.kind(), "Failed to encode event: {}", e);
                return 0;
            }
        };

        let delivered = self.registry.broadcast(&payload);
        tracing::debug!(kind = event.kind(), delivered, "Event published");
        delivered
    }
}
