use crate::application::{MarketSimulator, SimulatorHandle, StateStore};
use crate::domain::{Clock, ConnectionId};
use crate::infrastructure::ConnectionRegistry;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use thiserror::Error;
use tokio::sync::{Notify, mpsc};
use uuid::Uuid;

use super::WsState;
use super::message::{ClientMessage, ServerMessage, Snapshot};

/// Lifecycle of one stream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Open => write!(f, "open"),
            SessionState::Closing => write!(f, "closing"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Failure confined to a single connection
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Outbound queue closed")]
    QueueClosed,

    #[error("Session is {0}")]
    NotOpen(SessionState),
}

/// One live stream: snapshot on open, ping/pong while open, cleanup on close
///
/// Broadcasts and pongs for the connection go through `outbound`, which feeds
/// the connection's single writer task.
pub struct StreamSession {
    id: ConnectionId,
    state: SessionState,
    outbound: mpsc::Sender<String>,
    registry: Arc<ConnectionRegistry>,
    evicted: Arc<Notify>,
    simulator: Option<SimulatorHandle>,
}

impl StreamSession {
    /// Join the broadcast set, read the snapshot and start the bound simulator
    ///
    /// Registration happens before the store is read, so no change committed
    /// after the snapshot can be missed. The caller writes the returned
    /// snapshot frame to the socket before it starts draining `outbound`;
    /// events queued in between carry full entity state and replay safely.
    pub fn open<C: Clock + 'static>(
        state: &WsState<C>,
        outbound: mpsc::Sender<String>,
    ) -> Result<(Self, String), TransportError> {
        let id = Uuid::new_v4();
        let registry = Arc::clone(&state.registry);
        let evicted = registry.add(id, outbound.clone());

        let snapshot = ServerMessage::Snapshot(Snapshot {
            strategies: state.store.strategies(),
            orders: state.store.orders(),
            prices: state.store.prices(),
            system_status: state.store.system_status(),
        });
        let frame = match serde_json::to_string(&snapshot) {
            Ok(frame) => frame,
            Err(e) => {
                registry.remove(&id);
                return Err(e.into());
            }
        };

        let simulator = state.simulator.as_ref().map(|settings| {
            let n = state.sessions_opened.fetch_add(1, Ordering::Relaxed);
            MarketSimulator::new(
                Arc::clone(&state.store),
                Arc::clone(&state.event_bus),
                Arc::clone(&state.clock),
                settings.for_session(n),
            )
            .spawn()
        });

        let session = StreamSession {
            id,
            state: SessionState::Open,
            outbound,
            registry,
            evicted,
            simulator,
        };
        tracing::info!(id = %session.id, connections = session.registry.count(), "Stream opened");
        Ok((session, frame))
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Resolves once the registry has evicted this connection
    pub async fn evicted(&self) {
        self.evicted.notified().await
    }

    /// Handle one inbound text frame
    ///
    /// A non-JSON frame moves the session to closing and is returned as an error.
    pub async fn handle_text(&mut self, text: &str) -> Result<(), TransportError> {
        if self.state != SessionState::Open {
            return Err(TransportError::NotOpen(self.state));
        }

        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                self.state = SessionState::Closing;
                return Err(e.into());
            }
        };

        match serde_json::from_value::<ClientMessage>(value) {
            Ok(message) if message.is_ping() => self.send(&ServerMessage::Pong).await,
            Ok(message) => {
                tracing::debug!(id = %self.id, kind = %message.kind, "Ignoring client message");
                Ok(())
            }
            Err(_) => Ok(()),
        }
    }

    /// Stop the simulator and leave the broadcast set. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closing;

        if let Some(mut simulator) = self.simulator.take() {
            simulator.cancel().await;
        }
        self.registry.remove(&self.id);

        self.state = SessionState::Closed;
        tracing::info!(id = %self.id, connections = self.registry.count(), "Stream closed");
    }

    async fn send(&self, message: &ServerMessage) -> Result<(), TransportError> {
        let payload = serde_json::to_string(message)?;
        self.outbound
            .send(payload)
            .await
            .map_err(|_| TransportError::QueueClosed)
    }
}
