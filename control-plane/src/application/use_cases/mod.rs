mod dispatch_command;
mod market_simulator;

pub use dispatch_command::{
    Command, CommandDispatcher, CommandError, CommandOutcome, CommandRequest, OrderDefaults,
    PlaceOrder, RawId,
};
pub use market_simulator::{perturb, MarketSimulator, SimulatorHandle, SimulatorSettings};
