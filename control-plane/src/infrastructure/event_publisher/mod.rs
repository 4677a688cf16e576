mod connection_registry;
mod event_bus;

pub use connection_registry::ConnectionRegistry;
pub use event_bus::EventBus;
