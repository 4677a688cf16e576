use crate::application::ports::StateStore;
use crate::domain::{
    ExchangeConnection, ExchangeConnectionId, LogRecord, NewExchangeConnection, NewStrategy,
    Order, OrderId, Strategy, StrategyId, StrategyStatus, Timestamp,
};
use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory state store
///
/// Thread-safe storage using DashMap. Each read-modify-write runs under the
/// shard lock of the touched entry, so readers never see half of an update.
pub struct InMemoryStateStore {
    strategies: Arc<DashMap<StrategyId, Strategy>>,
    orders: Arc<DashMap<OrderId, Order>>,
    prices: Arc<DashMap<String, Decimal>>,
    exchanges: Arc<DashMap<ExchangeConnectionId, ExchangeConnection>>,
    logs: Arc<Mutex<VecDeque<LogRecord>>>,
    log_capacity: usize,
    next_strategy_id: Arc<AtomicU64>,
    next_exchange_id: Arc<AtomicU64>,
}

impl InMemoryStateStore {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            strategies: Arc::new(DashMap::new()),
            orders: Arc::new(DashMap::new()),
            prices: Arc::new(DashMap::new()),
            exchanges: Arc::new(DashMap::new()),
            logs: Arc::new(Mutex::new(VecDeque::with_capacity(log_capacity))),
            log_capacity,
            next_strategy_id: Arc::new(AtomicU64::new(1)),
            next_exchange_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Build a store pre-populated with fixtures
    pub fn seeded(
        log_capacity: usize,
        strategies: impl IntoIterator<Item = Strategy>,
        orders: impl IntoIterator<Item = Order>,
        prices: impl IntoIterator<Item = (String, Decimal)>,
    ) -> Self {
        let store = Self::new(log_capacity);
        for strategy in strategies {
            store.upsert_strategy(strategy);
        }
        for order in orders {
            if !store.insert_order(order) {
                tracing::warn!("Skipping seed order with duplicate id");
            }
        }
        for (symbol, price) in prices {
            store.set_price(&symbol, price);
        }
        store
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl Clone for InMemoryStateStore {
    fn clone(&self) -> Self {
        Self {
            strategies: Arc::clone(&self.strategies),
            orders: Arc::clone(&self.orders),
            prices: Arc::clone(&self.prices),
            exchanges: Arc::clone(&self.exchanges),
            logs: Arc::clone(&self.logs),
            log_capacity: self.log_capacity,
            next_strategy_id: Arc::clone(&self.next_strategy_id),
            next_exchange_id: Arc::clone(&self.next_exchange_id),
        }
    }
}

impl StateStore for InMemoryStateStore {
    fn strategies(&self) -> Vec<Strategy> {
        let mut strategies: Vec<Strategy> =
            self.strategies.iter().map(|s| s.value().clone()).collect();
        strategies.sort_by_key(|s| s.id);
        strategies
    }

    fn strategy(&self, id: StrategyId) -> Option<Strategy> {
        self.strategies.get(&id).map(|s| s.value().clone())
    }

    fn upsert_strategy(&self, strategy: Strategy) {
        self.next_strategy_id
            .fetch_max(strategy.id + 1, Ordering::SeqCst);
        self.strategies.insert(strategy.id, strategy);
    }

    fn register_strategy(&self, new: NewStrategy, created: NaiveDate) -> Strategy {
        loop {
            let id = self.next_strategy_id.fetch_add(1, Ordering::SeqCst);
            // Ids taken by a concurrent upsert are skipped
            if let Entry::Vacant(slot) = self.strategies.entry(id) {
                let strategy = Strategy::register(id, new, created);
                slot.insert(strategy.clone());
                return strategy;
            }
        }
    }

    fn set_strategy_status(&self, id: StrategyId, status: StrategyStatus) -> Option<Strategy> {
        let mut entry = self.strategies.get_mut(&id)?;
        entry.transition(status);
        Some(entry.value().clone())
    }

    fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|o| o.value().clone()).collect();
        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        orders
    }

    fn order(&self, id: &OrderId) -> Option<Order> {
        self.orders.get(id).map(|o| o.value().clone())
    }

    fn insert_order(&self, order: Order) -> bool {
        match self.orders.entry(order.order_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(order);
                true
            }
        }
    }

    fn cancel_order(&self, id: &OrderId, now: Timestamp) -> Option<Order> {
        let mut entry = self.orders.get_mut(id)?;
        entry.cancel(now);
        Some(entry.value().clone())
    }

    fn prices(&self) -> BTreeMap<String, Decimal> {
        self.prices
            .iter()
            .map(|p| (p.key().clone(), *p.value()))
            .collect()
    }

    fn price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).map(|p| *p.value())
    }

    fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.insert(symbol.to_string(), price);
    }

    fn update_price(
        &self,
        symbol: &str,
        update: &mut dyn FnMut(Decimal) -> Decimal,
    ) -> Option<Decimal> {
        let mut entry = self.prices.get_mut(symbol)?;
        let next = update(*entry.value());
        *entry.value_mut() = next;
        Some(next)
    }

    fn exchange_connections(&self) -> Vec<ExchangeConnection> {
        let mut exchanges: Vec<ExchangeConnection> =
            self.exchanges.iter().map(|e| e.value().clone()).collect();
        exchanges.sort_by_key(|e| e.id);
        exchanges
    }

    fn upsert_exchange_connection(&self, connection: ExchangeConnection) {
        self.next_exchange_id
            .fetch_max(connection.id + 1, Ordering::SeqCst);
        self.exchanges.insert(connection.id, connection);
    }

    fn register_exchange_connection(
        &self,
        new: NewExchangeConnection,
        now: Timestamp,
    ) -> ExchangeConnection {
        loop {
            let id = self.next_exchange_id.fetch_add(1, Ordering::SeqCst);
            if let Entry::Vacant(slot) = self.exchanges.entry(id) {
                let connection = ExchangeConnection::register(id, new, now);
                slot.insert(connection.clone());
                return connection;
            }
        }
    }

    fn remove_exchange_connection(&self, id: ExchangeConnectionId) -> Option<ExchangeConnection> {
        self.exchanges.remove(&id).map(|(_, connection)| connection)
    }

    fn record_log(&self, record: LogRecord) {
        if self.log_capacity == 0 {
            return;
        }
        let mut logs = self.logs.lock();
        while logs.len() >= self.log_capacity {
            logs.pop_front();
        }
        logs.push_back(record);
    }

    fn logs(&self) -> Vec<LogRecord> {
        self.logs.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LogLevel, Side};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn strategy(id: StrategyId, status: StrategyStatus) -> Strategy {
        Strategy {
            id,
            name: format!("Strategy {}", id),
            kind: "Arbitrage".to_string(),
            exchange: "Binance".to_string(),
            pair: "BTC/USDT".to_string(),
            status,
            profit: dec!(10.5),
            trades: 3,
            created: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    fn new_strategy(name: &str) -> NewStrategy {
        NewStrategy {
            name: name.to_string(),
            kind: "Pure Market Making".to_string(),
            exchange: "Binance".to_string(),
            pair: "BTC/USDT".to_string(),
        }
    }

    fn log(message: &str) -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            source: "system".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_strategies_sorted_by_id() {
        let store = InMemoryStateStore::default();
        store.upsert_strategy(strategy(3, StrategyStatus::Paused));
        store.upsert_strategy(strategy(1, StrategyStatus::Running));
        store.upsert_strategy(strategy(2, StrategyStatus::Stopped));

        let ids: Vec<_> = store.strategies().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_register_continues_after_seeded_ids() {
        let store = InMemoryStateStore::default();
        store.upsert_strategy(strategy(7, StrategyStatus::Running));

        let first = store.register_strategy(new_strategy("A"), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        let second = store.register_strategy(new_strategy("B"), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        assert_eq!(first.id, 8);
        assert_eq!(second.id, 9);
        assert_eq!(first.status, StrategyStatus::Stopped);
    }

    #[test]
    fn test_set_status_of_missing_strategy() {
        let store = InMemoryStateStore::default();
        assert!(store.set_strategy_status(1, StrategyStatus::Running).is_none());
        assert!(store.strategies().is_empty());
    }

    #[test]
    fn test_status_reflected_in_system_status() {
        let store = InMemoryStateStore::default();
        store.upsert_strategy(strategy(1, StrategyStatus::Stopped));
        store.upsert_strategy(strategy(2, StrategyStatus::Running));

        store.set_strategy_status(1, StrategyStatus::Running);
        let status = store.system_status();
        assert_eq!(status.active_strategies, 2);
        assert_eq!(status.total_profit, dec!(21.0));
        assert_eq!(status.total_trades, 6);
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let store = InMemoryStateStore::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 14, 32, 15).unwrap();
        let order = Order::pending(
            OrderId::from("ORD-001"),
            "BTC/USDT",
            Side::Buy,
            dec!(0.15),
            dec!(52345),
            None,
            now,
        );

        assert!(store.insert_order(order.clone()));
        assert!(!store.insert_order(order));
        assert_eq!(store.orders().len(), 1);
    }

    #[test]
    fn test_orders_sorted_by_creation() {
        let store = InMemoryStateStore::default();
        let early = Utc.with_ymd_and_hms(2024, 1, 20, 10, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 20, 11, 0, 0).unwrap();
        for (id, at) in [("ORD-B", late), ("ORD-A", early)] {
            store.insert_order(Order::pending(
                OrderId::from(id),
                "ETH/USDT",
                Side::Sell,
                dec!(1),
                dec!(2856),
                None,
                at,
            ));
        }

        let ids: Vec<_> = store.orders().into_iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![OrderId::from("ORD-A"), OrderId::from("ORD-B")]);
    }

    #[test]
    fn test_update_price_ignores_untracked_symbol() {
        let store = InMemoryStateStore::default();
        store.set_price("BTC/USDT", dec!(100));

        let updated = store.update_price("BTC/USDT", &mut |p| p + dec!(1));
        assert_eq!(updated, Some(dec!(101)));
        assert!(store.update_price("XRP/USDT", &mut |p| p + dec!(1)).is_none());
        assert_eq!(store.prices().len(), 1);
    }

    #[test]
    fn test_log_history_drops_oldest() {
        let store = InMemoryStateStore::new(2);
        store.record_log(log("first"));
        store.record_log(log("second"));
        store.record_log(log("third"));

        let messages: Vec<_> = store.logs().into_iter().map(|l| l.message).collect();
        assert_eq!(messages, vec!["second", "third"]);
    }

    #[test]
    fn test_clone_shares_state() {
        let store = InMemoryStateStore::default();
        let other = store.clone();
        other.set_price("SOL/USDT", dec!(98.5));
        assert_eq!(store.price("SOL/USDT"), Some(dec!(98.5)));
    }

    #[test]
    fn test_exchange_connections_lifecycle() {
        let store = InMemoryStateStore::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 14, 32, 15).unwrap();
        let seeded = ExchangeConnection::register(
            2,
            NewExchangeConnection {
                exchange: "Binance".to_string(),
                api_key: "abcdkL3x".to_string(),
                testnet: false,
            },
            now,
        );
        store.upsert_exchange_connection(seeded);

        let added = store.register_exchange_connection(
            NewExchangeConnection {
                exchange: "OKX".to_string(),
                api_key: "zzzz9f2Q".to_string(),
                testnet: true,
            },
            now,
        );
        assert_eq!(added.id, 3);

        let ids: Vec<_> = store.exchange_connections().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let removed = store.remove_exchange_connection(2).unwrap();
        assert_eq!(removed.exchange, "Binance");
        assert!(store.remove_exchange_connection(2).is_none());
        assert_eq!(store.exchange_connections().len(), 1);
    }
}
