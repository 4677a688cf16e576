use crate::domain::entities::{Order, OrderStatus, Strategy};
use rust_decimal::Decimal;
use serde::Serialize;

/// Aggregate view over all strategies
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SystemStatus {
    pub active_strategies: usize,
    pub total_profit: Decimal,
    pub total_trades: u64,
}

impl SystemStatus {
    pub fn from_strategies<'a>(strategies: impl IntoIterator<Item = &'a Strategy>) -> Self {
        strategies
            .into_iter()
            .fold(SystemStatus::default(), |mut status, strategy| {
                if strategy.status.is_running() {
                    status.active_strategies += 1;
                }
                status.total_profit += strategy.profit;
                status.total_trades += strategy.trades;
                status
            })
    }
}

/// Share of completed orders that filled, as a percentage with one decimal
///
/// `None` while no order has completed.
pub fn success_rate<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Option<Decimal> {
    let (filled, completed) = orders
        .into_iter()
        .filter(|order| order.status != OrderStatus::Pending)
        .fold((0u64, 0u64), |(filled, completed), order| {
            let filled = filled + u64::from(order.status == OrderStatus::Filled);
            (filled, completed + 1)
        });
    if completed == 0 {
        return None;
    }
    let rate = Decimal::from(filled) * Decimal::ONE_HUNDRED / Decimal::from(completed);
    Some(rate.round_dp(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, Side, StrategyStatus};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn strategy(id: u64, status: StrategyStatus, profit: Decimal, trades: u64) -> Strategy {
        Strategy {
            id,
            name: format!("S{}", id),
            kind: "Arbitrage".to_string(),
            exchange: "Binance".to_string(),
            pair: "ETH/BTC".to_string(),
            status,
            profit,
            trades,
            created: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        }
    }

    #[test]
    fn test_aggregates() {
        let strategies = vec![
            strategy(1, StrategyStatus::Running, dec!(523.00), 324),
            strategy(2, StrategyStatus::Running, dec!(892.00), 156),
            strategy(3, StrategyStatus::Paused, dec!(-38.50), 89),
        ];
        let status = SystemStatus::from_strategies(&strategies);
        assert_eq!(status.active_strategies, 2);
        assert_eq!(status.total_profit, dec!(1376.50));
        assert_eq!(status.total_trades, 569);
    }

    #[test]
    fn test_success_rate_ignores_pending() {
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 14, 32, 15).unwrap();
        let order = |id: &str, status: OrderStatus| {
            let mut order = Order::pending(
                OrderId::from(id),
                "BTC/USDT",
                Side::Buy,
                dec!(1),
                dec!(52345),
                None,
                now,
            );
            order.status = status;
            order
        };

        assert_eq!(success_rate(&[order("ORD-1", OrderStatus::Pending)]), None);

        let orders = vec![
            order("ORD-1", OrderStatus::Filled),
            order("ORD-2", OrderStatus::Filled),
            order("ORD-3", OrderStatus::Cancelled),
            order("ORD-4", OrderStatus::Pending),
        ];
        assert_eq!(success_rate(&orders), Some(dec!(66.7)));
    }

    #[test]
    fn test_empty() {
        let status = SystemStatus::from_strategies(&Vec::<Strategy>::new());
        assert_eq!(status, SystemStatus::default());
    }
}
