use crate::domain::ConnectionId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, error::TrySendError};

struct Connection {
    sender: mpsc::Sender<String>,
    evicted: Arc<Notify>,
}

/// Set of live stream connections, each reachable through its outbound queue
///
/// Broadcast works on a snapshot of the senders, so connections may be added
/// or removed while a broadcast is in flight. Broadcast never waits on a
/// queue: a connection whose queue is closed or full is evicted on the spot
/// and its session is signalled to shut down.
pub struct ConnectionRegistry {
    connections: Arc<DashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Register a connection. The returned notifier fires if the registry
    /// later evicts it.
    pub fn add(&self, id: ConnectionId, sender: mpsc::Sender<String>) -> Arc<Notify> {
        let evicted = Arc::new(Notify::new());
        self.connections.insert(
            id,
            Connection {
                sender,
                evicted: Arc::clone(&evicted),
            },
        );
        tracing::debug!(%id, total = self.count(), "Connection registered");
        evicted
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn remove(&self, id: &ConnectionId) -> bool {
        let removed = self.connections.remove(id).is_some();
        if removed {
            tracing::debug!(%id, total = self.count(), "Connection removed");
        }
        removed
    }

    fn evict(&self, id: &ConnectionId) {
        if let Some((_, connection)) = self.connections.remove(id) {
            connection.evicted.notify_one();
            tracing::debug!(%id, total = self.count(), "Connection evicted");
        }
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Offer one payload to every connection, in registry order of the snapshot.
    ///
    /// Returns the number of connections that accepted it.
    pub fn broadcast(&self, payload: &str) -> usize {
        let targets: Vec<(ConnectionId, mpsc::Sender<String>)> = self
            .connections
            .iter()
            .map(|entry| (*entry.key(), entry.value().sender.clone()))
            .collect();

        let mut delivered = 0;
        for (id, sender) in targets {
            match sender.try_send(payload.to_string()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(%id, "Outbound queue full, evicting slow connection");
                    self.evict(&id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::warn!(%id, "Dropping connection after failed send");
                    self.evict(&id);
                }
            }
        }
        delivered
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ConnectionRegistry {
    fn clone(&self) -> Self {
        Self {
            connections: Arc::clone(&self.connections),
        }
    }
}
