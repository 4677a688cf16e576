pub mod rest;
pub mod websocket;

pub use rest::{ApiError, AppState, Dispatcher, cors_layer, create_router};
pub use websocket::{StreamSession, WsState, ws_handler};
