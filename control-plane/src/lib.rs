//! Trading Control Plane
//!
//! Real-time control plane for a trading engine: keeps strategies, orders and
//! prices in memory, applies control commands, and streams state changes to
//! every connected client over WebSocket.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture with clear separation of concerns:
//!
//! - **Domain**: Entities and events (Strategy, Order, EngineEvent, etc.)
//! - **Application**: Port traits and use cases (CommandDispatcher, MarketSimulator)
//! - **Infrastructure**: Implementations of ports (InMemoryStateStore, EventBus, SimulationClock, config)
//! - **Presentation**: REST API, command channel and the `/api/stream` WebSocket
//!
//! # Example
//!
//! ```ignore
//! use control_plane::{ControlPlane, ControlPlaneConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let control_plane = ControlPlane::new(ControlPlaneConfig::default());
//!     control_plane.run().await?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types
pub use domain::{
    Clock, ControllableClock, EngineEvent, ExchangeConnection, LogLevel, LogRecord,
    NewExchangeConnection, NewStrategy, Order, OrderId, OrderStatus, Side, Strategy, StrategyId,
    StrategyStatus, SystemStatus, Timestamp,
};

pub use infrastructure::{
    ConfigError, ConnectionRegistry, ControlPlaneConfig, EventBus, InMemoryStateStore,
    SimulationClock,
};

pub use application::{
    Command, CommandDispatcher, CommandError, CommandOutcome, CommandRequest, OrderDefaults,
    SimulatorSettings,
};

// Re-export port traits for integration tests
pub use application::ports::{EventPublisher, StateStore};

pub use presentation::{AppState, Dispatcher, StreamSession, WsState, create_router};

use axum::Router;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// The control plane server
pub struct ControlPlane<C: Clock + 'static> {
    pub config: ControlPlaneConfig,
    pub clock: Arc<C>,
    pub store: Arc<InMemoryStateStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub event_bus: Arc<EventBus<C>>,
    pub dispatcher: Arc<Dispatcher<C>>,
}

impl<C: Clock + 'static> ControlPlane<C> {
    /// Create a control plane seeded from `config` with the given clock
    pub fn with_clock(config: ControlPlaneConfig, clock: Arc<C>) -> Self {
        let now = clock.now();
        let store = Arc::new(InMemoryStateStore::seeded(
            config.store.log_capacity,
            config.strategies.iter().cloned(),
            config.orders.iter().map(|order| order.to_order(now)),
            config.prices.clone(),
        ));
        for exchange in &config.exchanges {
            store.upsert_exchange_connection(exchange.to_connection(now));
        }
        let registry = Arc::new(ConnectionRegistry::new());
        let event_bus = Arc::new(EventBus::new(Arc::clone(&registry), Arc::clone(&clock)));
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&event_bus),
            Arc::clone(&clock),
            config.order_defaults(),
        ));

        ControlPlane {
            config,
            clock,
            store,
            registry,
            event_bus,
            dispatcher,
        }
    }

    /// Create the REST API router
    pub fn rest_router(&self) -> Router {
        let state = Arc::new(AppState::new(
            Arc::clone(&self.clock),
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            Arc::clone(&self.dispatcher),
        ));

        create_router(state)
    }

    /// Create WebSocket state
    pub fn ws_state(&self) -> Arc<WsState<C>> {
        Arc::new(WsState {
            clock: Arc::clone(&self.clock),
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            event_bus: Arc::clone(&self.event_bus),
            simulator: self
                .config
                .simulator
                .enabled
                .then(|| self.config.simulator_settings()),
            outbound_queue: self.config.server.outbound_queue,
            sessions_opened: AtomicU64::new(0),
        })
    }

    /// REST routes, command channel and stream endpoint with middleware applied
    pub fn router(&self) -> Router {
        let stream = Router::new()
            .route(
                "/api/stream",
                axum::routing::get(presentation::ws_handler::<C>),
            )
            .with_state(self.ws_state());

        self.rest_router()
            .merge(stream)
            .layer(TraceLayer::new_for_http())
            .layer(presentation::cors_layer(&self.config.server.cors_origins))
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let router = self.router();
        axum::serve(listener, router).await
    }

    /// Run the control plane server
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Control plane listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }
}

impl ControlPlane<SimulationClock> {
    /// Create a new control plane with a real-time clock
    pub fn new(config: ControlPlaneConfig) -> Self {
        let clock = Arc::new(SimulationClock::new());
        Self::with_clock(config, clock)
    }

    /// Create a new control plane with frozen time (for testing)
    pub fn fixed_time(config: ControlPlaneConfig) -> Self {
        let clock = Arc::new(SimulationClock::fixed());
        Self::with_clock(config, clock)
    }
}
