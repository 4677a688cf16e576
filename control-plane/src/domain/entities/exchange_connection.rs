use crate::domain::value_objects::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ExchangeConnectionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeConnectionStatus {
    Connected,
    Disconnected,
}

impl fmt::Display for ExchangeConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeConnectionStatus::Connected => write!(f, "connected"),
            ExchangeConnectionStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Configured exchange account. Only the masked API key is ever kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeConnection {
    pub id: ExchangeConnectionId,
    pub exchange: String,
    pub status: ExchangeConnectionStatus,
    pub api_key: String,
    pub testnet: bool,
    pub last_sync: Timestamp,
    /// Number of strategies trading through this account
    pub strategies: u32,
}

/// Request body for registering an exchange account
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExchangeConnection {
    pub exchange: String,
    pub api_key: String,
    #[serde(default)]
    pub testnet: bool,
}

const VISIBLE_KEY_CHARS: usize = 4;
const MASKED_KEY_CHARS: usize = 14;

/// Hide all but the last four characters of an API key
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    let tail: String = chars[chars.len().saturating_sub(VISIBLE_KEY_CHARS)..]
        .iter()
        .collect();
    format!("{}{}", "•".repeat(MASKED_KEY_CHARS), tail)
}

impl ExchangeConnection {
    /// A freshly registered, connected account with no strategies attached
    pub fn register(id: ExchangeConnectionId, new: NewExchangeConnection, now: Timestamp) -> Self {
        ExchangeConnection {
            id,
            exchange: new.exchange,
            status: ExchangeConnectionStatus::Connected,
            api_key: mask_api_key(&new.api_key),
            testnet: new.testnet,
            last_sync: now,
            strategies: 0,
        }
    }
}
