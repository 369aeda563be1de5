//! Domain types for the Auth Gateway.
//!
//! Configuration, the shared secret, clocks, and the error taxonomy. Nothing
//! in here performs network I/O.

pub mod clock;
pub mod config;
pub mod connection;
pub mod error;
pub mod secret;

// Re-exports for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AuthConfig, GatewayConfig, HttpConfig, WebSocketConfig};
pub use connection::ConnectionId;
pub use error::{ApiError, ApiResult, AuthDecision, AuthError, GatewayError};
pub use secret::{JwtSecret, SecretError};
