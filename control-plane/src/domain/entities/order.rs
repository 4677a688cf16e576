use crate::domain::value_objects::{OrderId, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub filled: Decimal,
    pub remaining: Decimal,
    pub price: Decimal,
    pub symbol: String,
    pub side: Side,
    /// Name of the owning strategy, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// A new unfilled order with the whole size remaining
    pub fn pending(
        order_id: OrderId,
        symbol: impl Into<String>,
        side: Side,
        size: Decimal,
        price: Decimal,
        strategy: Option<String>,
        now: Timestamp,
    ) -> Self {
        Order {
            order_id,
            status: OrderStatus::Pending,
            filled: Decimal::ZERO,
            remaining: size,
            price,
            symbol: symbol.into(),
            side,
            strategy,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn cancel(&mut self, now: Timestamp) {
        self.status = OrderStatus::Cancelled;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_pending_order() {
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 14, 32, 15).unwrap();
        let order = Order::pending(
            OrderId::from("ORD-001"),
            "BTC/USDT",
            Side::Buy,
            dec!(0.15),
            dec!(52345),
            Some("PMM Strategy".to_string()),
            now,
        );
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.filled, Decimal::ZERO);
        assert_eq!(order.remaining, dec!(0.15));
    }

    #[test]
    fn test_cancel_updates_timestamp() {
        let created = Utc.with_ymd_and_hms(2024, 1, 20, 14, 32, 15).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 20, 14, 40, 0).unwrap();
        let mut order = Order::pending(
            OrderId::from("ORD-002"),
            "ETH/USDT",
            Side::Sell,
            dec!(3.2),
            dec!(2856),
            None,
            created,
        );
        order.cancel(later);
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.created_at, created);
        assert_eq!(order.updated_at, later);
    }

    #[test]
    fn test_serialized_field_names() {
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();
        let order = Order::pending(
            OrderId::from("ORD-003"),
            "SOL/USDT",
            Side::Buy,
            dec!(1),
            dec!(98.5),
            None,
            now,
        );
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["orderId"], "ORD-003");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["side"], "buy");
        assert!(json.get("strategy").is_none());
    }
}
