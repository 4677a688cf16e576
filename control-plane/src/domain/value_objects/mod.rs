mod ids;
mod side;

pub use ids::{ConnectionId, OrderId, StrategyId};
pub use side::Side;

/// Wall-clock instant used across the domain
pub type Timestamp = chrono::DateTime<chrono::Utc>;
