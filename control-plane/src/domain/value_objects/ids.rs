use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Strategy identifier (sequential, assigned at registration)
pub type StrategyId = u64;

/// Identifier of one live stream connection; meaningful for the session only
pub type ConnectionId = Uuid;

/// Order identifier, e.g. `ORD-3F2A9C1B7E4D`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    const PREFIX: &'static str = "ORD-";

    /// Generate a fresh random order id
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string().to_uppercase();
        OrderId(format!("{}{}", Self::PREFIX, &raw[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        OrderId(value.to_string())
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        OrderId(value)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
