mod event_publisher;
mod state_store;

pub use event_publisher::EventPublisher;
pub use state_store::StateStore;
