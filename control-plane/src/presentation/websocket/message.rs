use crate::domain::{Order, Strategy, SystemStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inbound client frame. Only `type` is inspected.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl ClientMessage {
    pub fn is_ping(&self) -> bool {
        self.kind == "ping"
    }
}

/// Frames addressed to a single session (as opposed to broadcast events)
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot(Snapshot),
    Pong,
}

/// Full state sent once when a stream opens
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub strategies: Vec<Strategy>,
    pub orders: Vec<Order>,
    pub prices: BTreeMap<String, Decimal>,
    pub system_status: SystemStatus,
}
