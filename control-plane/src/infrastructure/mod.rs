pub mod clock;
pub mod config;
pub mod event_publisher;
pub mod repositories;

pub use clock::SimulationClock;
pub use config::{ConfigError, ControlPlaneConfig};
pub use event_publisher::{ConnectionRegistry, EventBus};
pub use repositories::InMemoryStateStore;
