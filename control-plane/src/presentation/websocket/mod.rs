mod handler;
mod message;
mod session;

pub use handler::{WsState, ws_handler};
pub use message::{ClientMessage, ServerMessage, Snapshot};
pub use session::{SessionState, StreamSession, TransportError};
