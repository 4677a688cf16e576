use crate::domain::{
    ExchangeConnection, ExchangeConnectionId, LogRecord, NewExchangeConnection, NewStrategy,
    Order, OrderId, Strategy, StrategyId, StrategyStatus, SystemStatus, Timestamp,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Authoritative in-memory state: strategies, orders, prices, exchange
/// accounts and log history
///
/// Every mutating method is a complete read-modify-write; implementations
/// must not expose a partially applied change to concurrent readers.
/// Listings return owned snapshots.
pub trait StateStore: Send + Sync {
    /// All strategies ordered by id
    fn strategies(&self) -> Vec<Strategy>;

    fn strategy(&self, id: StrategyId) -> Option<Strategy>;

    /// Insert or replace a strategy under its own id
    fn upsert_strategy(&self, strategy: Strategy);

    /// Register a new strategy under the next free id
    fn register_strategy(&self, new: NewStrategy, created: NaiveDate) -> Strategy;

    /// Set the status of an existing strategy, returning the updated strategy
    fn set_strategy_status(&self, id: StrategyId, status: StrategyStatus) -> Option<Strategy>;

    /// All orders ordered by creation time
    fn orders(&self) -> Vec<Order>;

    fn order(&self, id: &OrderId) -> Option<Order>;

    /// Insert a new order; returns false when the id is already taken
    fn insert_order(&self, order: Order) -> bool;

    /// Mark an existing order cancelled, returning the updated order
    fn cancel_order(&self, id: &OrderId, now: Timestamp) -> Option<Order>;

    /// Current price per symbol
    fn prices(&self) -> BTreeMap<String, Decimal>;

    fn price(&self, symbol: &str) -> Option<Decimal>;

    /// Overwrite (or start tracking) the price of a symbol
    fn set_price(&self, symbol: &str, price: Decimal);

    /// Replace a tracked price with `update(old)`; untracked symbols are left alone
    fn update_price(
        &self,
        symbol: &str,
        update: &mut dyn FnMut(Decimal) -> Decimal,
    ) -> Option<Decimal>;

    /// Exchange accounts ordered by id
    fn exchange_connections(&self) -> Vec<ExchangeConnection>;

    fn upsert_exchange_connection(&self, connection: ExchangeConnection);

    /// Register a new exchange account under the next free id
    fn register_exchange_connection(
        &self,
        new: NewExchangeConnection,
        now: Timestamp,
    ) -> ExchangeConnection;

    fn remove_exchange_connection(&self, id: ExchangeConnectionId) -> Option<ExchangeConnection>;

    /// Append to the bounded log history
    fn record_log(&self, record: LogRecord);

    /// Log history, oldest first
    fn logs(&self) -> Vec<LogRecord>;

    fn system_status(&self) -> SystemStatus {
        SystemStatus::from_strategies(&self.strategies())
    }
}
