pub mod ports;
pub mod use_cases;

pub use ports::{EventPublisher, StateStore};
pub use use_cases::{
    Command, CommandDispatcher, CommandError, CommandOutcome, CommandRequest, MarketSimulator,
    OrderDefaults, PlaceOrder, RawId, SimulatorHandle, SimulatorSettings,
};
