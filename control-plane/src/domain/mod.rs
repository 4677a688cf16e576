pub mod entities;
pub mod events;
pub mod services;
pub mod value_objects;

// Re-export entity types
pub use entities::{
    ExchangeConnection, ExchangeConnectionId, ExchangeConnectionStatus, LogLevel, LogRecord,
    NewExchangeConnection, NewStrategy, Order, OrderStatus, Strategy, StrategyStatus,
    SystemStatus, mask_api_key, success_rate,
};

// Re-export events
pub use events::{EngineEvent, LogEvent, PriceEvent, StrategyEvent};

// Re-export services
pub use services::{Clock, ControllableClock};

// Re-export value objects
pub use value_objects::{ConnectionId, OrderId, Side, StrategyId, Timestamp};
