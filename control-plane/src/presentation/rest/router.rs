use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::handlers;
use crate::application::CommandDispatcher;
use crate::domain::{Clock, Timestamp};
use crate::infrastructure::{ConnectionRegistry, EventBus, InMemoryStateStore};

/// Dispatcher over the concrete in-memory infrastructure
pub type Dispatcher<C> = CommandDispatcher<InMemoryStateStore, EventBus<C>, C>;

/// Application state shared across handlers - uses concrete infrastructure types
pub struct AppState<C: Clock> {
    pub clock: Arc<C>,
    pub store: Arc<InMemoryStateStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<Dispatcher<C>>,
    /// When this state was built; the dashboard reports uptime from it
    pub started_at: Timestamp,
}

impl<C: Clock> AppState<C> {
    pub fn new(
        clock: Arc<C>,
        store: Arc<InMemoryStateStore>,
        registry: Arc<ConnectionRegistry>,
        dispatcher: Arc<Dispatcher<C>>,
    ) -> Self {
        let started_at = clock.now();
        AppState {
            started_at,
            clock,
            store,
            registry,
            dispatcher,
        }
    }
}

/// CORS policy: any origin when none are configured
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the REST API router
pub fn create_router<C: Clock + 'static>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/", get(handlers::banner))
        .route("/api/health", get(handlers::health::<C>))
        .route("/api/dashboard", get(handlers::dashboard::<C>))
        // Strategies
        .route(
            "/api/strategies",
            get(handlers::list_strategies::<C>).post(handlers::create_strategy::<C>),
        )
        .route("/api/strategies/{id}", get(handlers::get_strategy::<C>))
        .route(
            "/api/strategies/{id}/start",
            post(handlers::start_strategy::<C>),
        )
        .route(
            "/api/strategies/{id}/stop",
            post(handlers::stop_strategy::<C>),
        )
        .route(
            "/api/strategies/{id}/pause",
            post(handlers::pause_strategy::<C>),
        )
        // Exchange accounts
        .route(
            "/api/connections",
            get(handlers::list_exchange_connections::<C>)
                .post(handlers::create_exchange_connection::<C>),
        )
        .route(
            "/api/connections/{id}",
            delete(handlers::delete_exchange_connection::<C>),
        )
        // Orders, prices, logs
        .route("/api/orders", get(handlers::list_orders::<C>))
        .route("/api/orders/{id}", get(handlers::get_order::<C>))
        .route("/api/prices", get(handlers::prices::<C>))
        .route("/api/logs", get(handlers::logs::<C>))
        // Command channel
        .route("/api/command", post(handlers::command::<C>))
        .with_state(state)
}
