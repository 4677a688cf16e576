use crate::application::ports::{EventPublisher, StateStore};
use crate::domain::{
    Clock, EngineEvent, NewStrategy, Order, OrderId, Side, Strategy, StrategyEvent, StrategyId,
    StrategyStatus, SystemStatus,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Raw command as received on the command channel
///
/// `{cmd, id?, symbol?, side?, size?, price?, order_id?, strategy?}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub cmd: String,
    pub id: Option<RawId>,
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub size: Option<Decimal>,
    pub price: Option<Decimal>,
    pub order_id: Option<String>,
    pub strategy: Option<String>,
}

impl CommandRequest {
    pub fn new(cmd: impl Into<String>) -> Self {
        CommandRequest {
            cmd: cmd.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: StrategyId) -> Self {
        self.id = Some(RawId::Number(id));
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }
}

/// Strategy id as sent by clients: either a number or a numeric string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(StrategyId),
    Text(String),
}

impl RawId {
    pub fn as_strategy_id(&self) -> Option<StrategyId> {
        match self {
            RawId::Number(id) => Some(*id),
            RawId::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(id) => write!(f, "{}", id),
            RawId::Text(text) => f.write_str(text),
        }
    }
}

/// Order placement parameters after validation
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrder {
    pub symbol: Option<String>,
    pub side: Side,
    pub size: Option<Decimal>,
    pub price: Option<Decimal>,
    pub strategy: Option<String>,
}

/// A recognized control command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetStrategyStatus {
        id: Option<RawId>,
        status: StrategyStatus,
    },
    PlaceOrder(PlaceOrder),
    CancelOrder {
        order_id: Option<String>,
    },
    GetSystemStatus,
    GetStrategies,
    GetOrders,
}

impl TryFrom<CommandRequest> for Command {
    type Error = CommandError;

    fn try_from(request: CommandRequest) -> Result<Self, Self::Error> {
        let command = match request.cmd.as_str() {
            "start_strategy" => Command::SetStrategyStatus {
                id: request.id,
                status: StrategyStatus::Running,
            },
            "stop_strategy" => Command::SetStrategyStatus {
                id: request.id,
                status: StrategyStatus::Stopped,
            },
            "pause_strategy" => Command::SetStrategyStatus {
                id: request.id,
                status: StrategyStatus::Paused,
            },
            "place_order" => {
                let side = match request.side.as_deref().map(Side::try_from) {
                    Some(Ok(side)) => side,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Unrecognized side, placing a buy order");
                        Side::default()
                    }
                    None => Side::default(),
                };
                let size = match request.size {
                    Some(size) if size <= Decimal::ZERO => {
                        tracing::warn!(%size, "Non-positive size, using the default size");
                        None
                    }
                    size => size,
                };
                Command::PlaceOrder(PlaceOrder {
                    symbol: request.symbol,
                    side,
                    size,
                    price: request.price,
                    strategy: request.strategy,
                })
            }
            "cancel_order" => Command::CancelOrder {
                order_id: request.order_id,
            },
            "get_system_status" => Command::GetSystemStatus,
            "get_strategies" => Command::GetStrategies,
            "get_orders" => Command::GetOrders,
            "" => return Err(CommandError::InvalidCommand("missing cmd".to_string())),
            other => {
                return Err(CommandError::InvalidCommand(format!(
                    "unknown command: {}",
                    other
                )));
            }
        };
        Ok(command)
    }
}

/// Successful command result, serialized next to `status: "success"`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandOutcome {
    Strategy {
        message: String,
        strategy: Strategy,
    },
    OrderPlaced {
        order_id: OrderId,
        order: Order,
    },
    OrderCancelled {
        message: String,
        order_id: OrderId,
        order: Order,
    },
    SystemStatus(SystemStatus),
    Strategies {
        strategies: Vec<Strategy>,
    },
    Orders {
        orders: Vec<Order>,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Internal failure: {0}")]
    InternalFailure(String),
}

impl CommandError {
    fn strategy_not_found(id: Option<&RawId>) -> Self {
        CommandError::NotFound {
            entity: "Strategy",
            id: id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }

    fn order_not_found(id: Option<&str>) -> Self {
        CommandError::NotFound {
            entity: "Order",
            id: id.unwrap_or_default().to_string(),
        }
    }
}

/// Defaults applied to `place_order` when the request leaves fields out
#[derive(Debug, Clone)]
pub struct OrderDefaults {
    /// Symbol used when the request carries none
    pub symbol: String,
    /// Order size used when the request carries none
    pub size: Decimal,
    /// Price used when the symbol has no tracked price
    pub fallback_price: Decimal,
}

impl Default for OrderDefaults {
    fn default() -> Self {
        OrderDefaults {
            symbol: "BTC/USDT".to_string(),
            size: dec!(1.0),
            fallback_price: dec!(50000),
        }
    }
}

/// Validates commands, applies them to the state store and publishes the
/// resulting event.
///
/// The store mutation completes before the event is published. If nobody
/// receives the event the change still stands; it is not retried.
pub struct CommandDispatcher<S, E, C> {
    store: Arc<S>,
    event_publisher: Arc<E>,
    clock: Arc<C>,
    defaults: OrderDefaults,
}

impl<S, E, C> CommandDispatcher<S, E, C>
where
    S: StateStore,
    E: EventPublisher,
    C: Clock,
{
    pub fn new(store: Arc<S>, event_publisher: Arc<E>, clock: Arc<C>, defaults: OrderDefaults) -> Self {
        Self {
            store,
            event_publisher,
            clock,
            defaults,
        }
    }

    /// Parse and execute a raw command
    pub async fn dispatch(&self, request: CommandRequest) -> Result<CommandOutcome, CommandError> {
        let cmd = request.cmd.clone();
        let result = match Command::try_from(request) {
            Ok(command) => self.execute(command).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::debug!(%cmd, error = %e, "Command rejected");
        }
        result
    }

    pub async fn execute(&self, command: Command) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::SetStrategyStatus { id, status } => {
                self.set_strategy_status(id.as_ref(), status).await
            }
            Command::PlaceOrder(order) => self.place_order(order).await,
            Command::CancelOrder { order_id } => self.cancel_order(order_id.as_deref()).await,
            Command::GetSystemStatus => Ok(CommandOutcome::SystemStatus(self.store.system_status())),
            Command::GetStrategies => Ok(CommandOutcome::Strategies {
                strategies: self.store.strategies(),
            }),
            Command::GetOrders => Ok(CommandOutcome::Orders {
                orders: self.store.orders(),
            }),
        }
    }

    /// Register a new strategy (stopped) and announce it on the stream
    pub async fn register_strategy(&self, new: NewStrategy) -> Strategy {
        let created = self.clock.now().date_naive();
        let strategy = self.store.register_strategy(new, created);
        tracing::info!(id = strategy.id, name = %strategy.name, "Strategy registered");

        self.event_publisher
            .publish(EngineEvent::Strategy(StrategyEvent::from(&strategy)))
            .await;
        strategy
    }

    async fn set_strategy_status(
        &self,
        id: Option<&RawId>,
        status: StrategyStatus,
    ) -> Result<CommandOutcome, CommandError> {
        let strategy = id
            .and_then(RawId::as_strategy_id)
            .and_then(|id| self.store.set_strategy_status(id, status))
            .ok_or_else(|| CommandError::strategy_not_found(id))?;

        tracing::info!(id = strategy.id, %status, "Strategy status changed");

        self.event_publisher
            .publish(EngineEvent::Strategy(StrategyEvent::from(&strategy)))
            .await;

        let message = match status {
            StrategyStatus::Running => "Strategy started",
            StrategyStatus::Stopped => "Strategy stopped",
            StrategyStatus::Paused => "Strategy paused",
            StrategyStatus::Error => "Strategy failed",
        };
        Ok(CommandOutcome::Strategy {
            message: message.to_string(),
            strategy,
        })
    }

    async fn place_order(&self, request: PlaceOrder) -> Result<CommandOutcome, CommandError> {
        let symbol = request
            .symbol
            .unwrap_or_else(|| self.defaults.symbol.clone());
        let size = request.size.unwrap_or(self.defaults.size);
        let price = request
            .price
            .or_else(|| self.store.price(&symbol))
            .unwrap_or(self.defaults.fallback_price);

        let order = Order::pending(
            OrderId::generate(),
            symbol,
            request.side,
            size,
            price,
            request.strategy,
            self.clock.now(),
        );

        if !self.store.insert_order(order.clone()) {
            return Err(CommandError::InternalFailure(format!(
                "order id collision: {}",
                order.order_id
            )));
        }

        tracing::info!(
            order_id = %order.order_id,
            symbol = %order.symbol,
            side = %order.side,
            %size,
            %price,
            "Order placed"
        );

        self.event_publisher
            .publish(EngineEvent::OrderUpdate(order.clone()))
            .await;

        Ok(CommandOutcome::OrderPlaced {
            order_id: order.order_id.clone(),
            order,
        })
    }

    async fn cancel_order(&self, order_id: Option<&str>) -> Result<CommandOutcome, CommandError> {
        let order = order_id
            .and_then(|id| self.store.cancel_order(&OrderId::from(id), self.clock.now()))
            .ok_or_else(|| CommandError::order_not_found(order_id))?;

        tracing::info!(order_id = %order.order_id, "Order cancelled");

        self.event_publisher
            .publish(EngineEvent::OrderUpdate(order.clone()))
            .await;

        Ok(CommandOutcome::OrderCancelled {
            message: "Order cancelled".to_string(),
            order_id: order.order_id.clone(),
            order,
        })
    }
}
