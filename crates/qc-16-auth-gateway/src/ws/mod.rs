//! WebSocket transport: connect-time gate and connection loop.

pub mod gate;
pub mod handler;

pub use gate::{ConnectTimeGate, ConnectionState, HandshakeError, WsSession};
pub use handler::{WebSocketHandler, DEFAULT_MAX_MESSAGE_SIZE};
