use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use crate::application::SimulatorSettings;
use crate::domain::Clock;
use crate::infrastructure::{ConnectionRegistry, EventBus, InMemoryStateStore};

use super::session::StreamSession;

/// WebSocket connection state
pub struct WsState<C: Clock> {
    pub clock: Arc<C>,
    pub store: Arc<InMemoryStateStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub event_bus: Arc<EventBus<C>>,
    /// Per-session simulator settings; `None` disables the simulator
    pub simulator: Option<SimulatorSettings>,
    /// Capacity of each connection's outbound queue
    pub outbound_queue: usize,
    /// Sessions opened so far; offsets each simulator's seed
    pub sessions_opened: AtomicU64,
}

/// Handle WebSocket upgrade
pub async fn ws_handler<C: Clock + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<WsState<C>>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket<C: Clock + 'static>(socket: WebSocket, state: Arc<WsState<C>>) {
    let (mut sender, mut receiver) = socket.split();

    // Channel for outgoing messages
    let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(state.outbound_queue.max(1));

    let (mut session, snapshot) = match StreamSession::open(&state, tx) {
        Ok(opened) => opened,
        Err(e) => {
            tracing::warn!("Failed to open stream: {}", e);
            return;
        }
    };

    // Snapshot goes out before anything queued since registration
    if let Err(e) = sender.send(Message::Text(snapshot.into())).await {
        tracing::debug!(id = %session.id(), "Failed to send snapshot: {}", e);
        session.close().await;
        return;
    }

    // Spawn task to forward messages to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut evicted = false;
    loop {
        let frame = tokio::select! {
            _ = session.evicted() => {
                tracing::warn!(id = %session.id(), "Stream evicted by broadcast");
                evicted = true;
                break;
            }
            frame = receiver.next() => frame,
        };
        match frame {
            Some(Ok(Message::Text(text))) => {
                if let Err(e) = session.handle_text(text.as_str()).await {
                    tracing::warn!(id = %session.id(), "Closing stream: {}", e);
                    break;
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!(id = %session.id(), "Stream receive error: {}", e);
                break;
            }
        }
    }

    // Cleanup
    session.close().await;
    drop(session);
    // An evicted peer is not reading; its writer may never finish flushing
    if evicted {
        send_task.abort();
    }
    let _ = send_task.await;
}
