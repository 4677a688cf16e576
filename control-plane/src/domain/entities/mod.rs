mod exchange_connection;
mod log_record;
mod order;
mod strategy;
mod system_status;

pub use exchange_connection::{
    ExchangeConnection, ExchangeConnectionId, ExchangeConnectionStatus, NewExchangeConnection,
    mask_api_key,
};
pub use log_record::{LogLevel, LogRecord};
pub use order::{Order, OrderStatus};
pub use strategy::{NewStrategy, Strategy, StrategyStatus};
pub use system_status::{SystemStatus, success_rate};
