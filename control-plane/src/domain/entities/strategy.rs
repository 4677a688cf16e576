use crate::domain::value_objects::StrategyId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
    Running,
    Stopped,
    Paused,
    Error,
}

impl StrategyStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, StrategyStatus::Running)
    }
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyStatus::Running => write!(f, "running"),
            StrategyStatus::Stopped => write!(f, "stopped"),
            StrategyStatus::Paused => write!(f, "paused"),
            StrategyStatus::Error => write!(f, "error"),
        }
    }
}

/// An automated trading strategy tracked by the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: StrategyId,
    pub name: String,
    /// Strategy family, e.g. "Pure Market Making"
    #[serde(rename = "type")]
    pub kind: String,
    pub exchange: String,
    pub pair: String,
    pub status: StrategyStatus,
    /// Realized profit in quote currency (signed)
    pub profit: Decimal,
    pub trades: u64,
    pub created: NaiveDate,
}

impl Strategy {
    /// Build a freshly registered strategy: stopped, no profit, no trades
    pub fn register(id: StrategyId, new: NewStrategy, created: NaiveDate) -> Self {
        Strategy {
            id,
            name: new.name,
            kind: new.kind,
            exchange: new.exchange,
            pair: new.pair,
            status: StrategyStatus::Stopped,
            profit: Decimal::ZERO,
            trades: 0,
            created,
        }
    }

    /// Move to `status`, returning the previous status
    pub fn transition(&mut self, status: StrategyStatus) -> StrategyStatus {
        std::mem::replace(&mut self.status, status)
    }
}

/// Registration request for a new strategy
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewStrategy {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub exchange: String,
    pub pair: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Strategy {
        Strategy {
            id: 1,
            name: "PMM Strategy".to_string(),
            kind: "Pure Market Making".to_string(),
            exchange: "Binance".to_string(),
            pair: "BTC/USDT".to_string(),
            status: StrategyStatus::Running,
            profit: dec!(523.00),
            trades: 324,
            created: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    #[test]
    fn test_transition_returns_previous_status() {
        let mut strategy = sample();
        let previous = strategy.transition(StrategyStatus::Paused);
        assert_eq!(previous, StrategyStatus::Running);
        assert_eq!(strategy.status, StrategyStatus::Paused);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "Pure Market Making");
        assert_eq!(json["status"], "running");
        assert_eq!(json["created"], "2024-01-15");
        assert_eq!(json["profit"].as_f64().unwrap(), 523.0);
    }

    #[test]
    fn test_register_starts_stopped() {
        let new = NewStrategy {
            name: "Grid".to_string(),
            kind: "Grid".to_string(),
            exchange: "Binance".to_string(),
            pair: "ETH/USDT".to_string(),
        };
        let strategy = Strategy::register(7, new, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(strategy.id, 7);
        assert_eq!(strategy.status, StrategyStatus::Stopped);
        assert_eq!(strategy.profit, Decimal::ZERO);
        assert_eq!(strategy.trades, 0);
    }
}
