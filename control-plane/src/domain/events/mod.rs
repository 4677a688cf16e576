use crate::domain::entities::{LogLevel, Order, Strategy, StrategyStatus};
use crate::domain::value_objects::StrategyId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Events pushed to every connected stream
///
/// Serialized with a `type` tag; the event bus adds the emission `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Current price for a symbol
    Price(PriceEvent),
    /// Engine log line
    Log(LogEvent),
    /// Full strategy state after a change
    Strategy(StrategyEvent),
    /// Full order state after a change
    OrderUpdate(Order),
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::Price(_) => "price",
            EngineEvent::Log(_) => "log",
            EngineEvent::Strategy(_) => "strategy",
            EngineEvent::OrderUpdate(_) => "order_update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceEvent {
    pub symbol: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub source: String,
    pub msg: String,
}

/// Strategy snapshot as carried on the stream
///
/// The strategy family goes out as `strategy_type` because `type` is the event tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyEvent {
    pub id: StrategyId,
    pub name: String,
    pub strategy_type: String,
    pub exchange: String,
    pub pair: String,
    pub status: StrategyStatus,
    pub profit: Decimal,
    pub trades: u64,
    pub created: NaiveDate,
}

impl From<&Strategy> for StrategyEvent {
    fn from(strategy: &Strategy) -> Self {
        StrategyEvent {
            id: strategy.id,
            name: strategy.name.clone(),
            strategy_type: strategy.kind.clone(),
            exchange: strategy.exchange.clone(),
            pair: strategy.pair.clone(),
            status: strategy.status,
            profit: strategy.profit,
            trades: strategy.trades,
            created: strategy.created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_event_shape() {
        let event = EngineEvent::Price(PriceEvent {
            symbol: "BTC/USDT".to_string(),
            price: dec!(52345.5),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "price");
        assert_eq!(json["symbol"], "BTC/USDT");
        assert_eq!(json["price"].as_f64().unwrap(), 52345.5);
    }

    #[test]
    fn test_log_event_shape() {
        let event = EngineEvent::Log(LogEvent {
            level: LogLevel::Warn,
            source: "system".to_string(),
            msg: "Latency spike".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "log");
        assert_eq!(json["level"], "warn");
        assert_eq!(json["msg"], "Latency spike");
        assert_eq!(event.kind(), "log");
    }
}
