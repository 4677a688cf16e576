use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::{Command, CommandRequest, RawId, StateStore};
use crate::domain::{
    Clock, ExchangeConnection, LogLevel, LogRecord, NewExchangeConnection, NewStrategy, Order,
    OrderId, OrderStatus, Side, Strategy, StrategyStatus, success_rate,
};
use crate::presentation::rest::{ApiError, dto::*};

use super::AppState;

/// GET /
pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        name: "Trading Control Plane",
        version: env!("CARGO_PKG_VERSION"),
        stream: "/api/stream",
    })
}

/// GET /api/health
pub async fn health<C: Clock>(State(state): State<Arc<AppState<C>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: state.clock.now(),
        version: env!("CARGO_PKG_VERSION"),
        connections: state.registry.count(),
    })
}

/// GET /api/dashboard
pub async fn dashboard<C: Clock>(State(state): State<Arc<AppState<C>>>) -> Json<DashboardResponse> {
    let strategies = state.store.strategies();
    let status = state.store.system_status();
    let rate = success_rate(&state.store.orders());
    let uptime = state.clock.now() - state.started_at;
    Json(DashboardResponse::new(status, rate, uptime, strategies))
}

/// GET /api/strategies
pub async fn list_strategies<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
) -> Json<Vec<Strategy>> {
    Json(state.store.strategies())
}

/// GET /api/strategies/{id}
pub async fn get_strategy<C: Clock>(
    Path(id): Path<String>,
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Strategy>, ApiError> {
    let id = parse_strategy_id(&id)?;
    state
        .store
        .strategy(id)
        .map(Json)
        .ok_or_else(|| ApiError::strategy_not_found(id))
}

/// POST /api/strategies
pub async fn create_strategy<C: Clock + 'static>(
    State(state): State<Arc<AppState<C>>>,
    payload: Result<Json<NewStrategy>, JsonRejection>,
) -> Result<(StatusCode, Json<Strategy>), ApiError> {
    let Json(new) = payload?;
    if new.name.trim().is_empty() {
        return Err(ApiError::invalid_parameter("name", "must not be empty"));
    }

    let strategy = state.dispatcher.register_strategy(new).await;
    Ok((StatusCode::CREATED, Json(strategy)))
}

/// POST /api/strategies/{id}/start
pub async fn start_strategy<C: Clock + 'static>(
    path: Path<String>,
    state: State<Arc<AppState<C>>>,
) -> Result<Json<CommandResponse>, ApiError> {
    set_strategy_status(path, state, StrategyStatus::Running).await
}

/// POST /api/strategies/{id}/stop
pub async fn stop_strategy<C: Clock + 'static>(
    path: Path<String>,
    state: State<Arc<AppState<C>>>,
) -> Result<Json<CommandResponse>, ApiError> {
    set_strategy_status(path, state, StrategyStatus::Stopped).await
}

/// POST /api/strategies/{id}/pause
pub async fn pause_strategy<C: Clock + 'static>(
    path: Path<String>,
    state: State<Arc<AppState<C>>>,
) -> Result<Json<CommandResponse>, ApiError> {
    set_strategy_status(path, state, StrategyStatus::Paused).await
}

async fn set_strategy_status<C: Clock + 'static>(
    Path(id): Path<String>,
    State(state): State<Arc<AppState<C>>>,
    status: StrategyStatus,
) -> Result<Json<CommandResponse>, ApiError> {
    let outcome = state
        .dispatcher
        .execute(Command::SetStrategyStatus {
            id: Some(RawId::Text(id)),
            status,
        })
        .await?;
    Ok(Json(outcome.into()))
}

/// GET /api/orders?status&strategy&side (`order_type` is accepted for `side`)
pub async fn list_orders<C: Clock>(
    Query(query): Query<OrdersQuery>,
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(parse_order_status)
        .transpose()?;
    let side = query
        .side
        .as_deref()
        .map(|s| Side::try_from(s).map_err(|e| ApiError::invalid_parameter("side", e)))
        .transpose()?;

    let orders = state
        .store
        .orders()
        .into_iter()
        .filter(|o| status.is_none_or(|s| o.status == s))
        .filter(|o| side.is_none_or(|s| o.side == s))
        .filter(|o| {
            query
                .strategy
                .as_deref()
                .is_none_or(|name| o.strategy.as_deref() == Some(name))
        })
        .collect();

    Ok(Json(orders))
}

/// GET /api/orders/{id}
pub async fn get_order<C: Clock>(
    Path(id): Path<String>,
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Order>, ApiError> {
    state
        .store
        .order(&OrderId::from(id.as_str()))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Order not found: {}", id)))
}

/// GET /api/connections
pub async fn list_exchange_connections<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
) -> Json<Vec<ExchangeConnection>> {
    Json(state.store.exchange_connections())
}

/// POST /api/connections
pub async fn create_exchange_connection<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    payload: Result<Json<NewExchangeConnection>, JsonRejection>,
) -> Result<(StatusCode, Json<ExchangeConnection>), ApiError> {
    let Json(new) = payload?;
    if new.exchange.trim().is_empty() {
        return Err(ApiError::invalid_parameter("exchange", "must not be empty"));
    }
    if new.api_key.trim().is_empty() {
        return Err(ApiError::invalid_parameter("apiKey", "must not be empty"));
    }

    let connection = state
        .store
        .register_exchange_connection(new, state.clock.now());
    tracing::info!(id = connection.id, exchange = %connection.exchange, "Exchange connection added");
    Ok((StatusCode::CREATED, Json(connection)))
}

/// DELETE /api/connections/{id}
pub async fn delete_exchange_connection<C: Clock>(
    Path(id): Path<String>,
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let not_found = || ApiError::not_found(format!("Connection not found: {}", id));
    let connection_id: u64 = id.trim().parse().map_err(|_| not_found())?;

    let removed = state
        .store
        .remove_exchange_connection(connection_id)
        .ok_or_else(not_found)?;
    tracing::info!(id = removed.id, exchange = %removed.exchange, "Exchange connection removed");
    Ok(Json(MessageResponse::success("Connection deleted")))
}

/// GET /api/prices
pub async fn prices<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
) -> Json<BTreeMap<String, Decimal>> {
    Json(state.store.prices())
}

/// GET /api/logs?level&source&limit
///
/// Newest record last; `limit` keeps the most recent matches.
pub async fn logs<C: Clock>(
    Query(query): Query<LogsQuery>,
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Vec<LogRecord>>, ApiError> {
    let level = query
        .level
        .as_deref()
        .map(|l| LogLevel::try_from(l).map_err(|e| ApiError::invalid_parameter("level", e)))
        .transpose()?;

    let mut records: Vec<LogRecord> = state
        .store
        .logs()
        .into_iter()
        .filter(|r| level.is_none_or(|l| r.level == l))
        .filter(|r| {
            query
                .source
                .as_deref()
                .is_none_or(|source| r.source == source)
        })
        .collect();

    let skip = records.len().saturating_sub(query.limit());
    records.drain(..skip);
    Ok(Json(records))
}

/// POST /api/command
pub async fn command<C: Clock + 'static>(
    State(state): State<Arc<AppState<C>>>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let Json(request) = payload?;
    let outcome = state.dispatcher.dispatch(request).await?;
    Ok(Json(outcome.into()))
}

fn parse_strategy_id(id: &str) -> Result<u64, ApiError> {
    id.trim()
        .parse()
        .map_err(|_| ApiError::not_found(format!("Strategy not found: {}", id)))
}

fn parse_order_status(value: &str) -> Result<OrderStatus, ApiError> {
    match value.to_lowercase().as_str() {
        "pending" => Ok(OrderStatus::Pending),
        "filled" => Ok(OrderStatus::Filled),
        "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
        "failed" => Ok(OrderStatus::Failed),
        _ => Err(ApiError::invalid_parameter(
            "status",
            "must be pending, filled, cancelled or failed",
        )),
    }
}
