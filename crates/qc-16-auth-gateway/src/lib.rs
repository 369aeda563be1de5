// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! QC-16 Auth Gateway - JWT-authenticated JSON-RPC endpoints over HTTP and
//! WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         AUTH GATEWAY (qc-16)                          │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────────────┐  │
//! │  │  HTTP/RPC   │  │  WebSocket  │  │   Authenticated (HTTP + WS)  │  │
//! │  │  Port 8545  │  │  Port 8546  │  │          Port 8551           │  │
//! │  └──────┬──────┘  └──────┬──────┘  └───────┬──────────────┬───────┘  │
//! │         │                │          PerCallAuthLayer  ConnectTimeGate │
//! │         │                │           (every POST)     (once/upgrade)  │
//! │  ┌──────┴────────────────┴──────────────────┴──────────────┴───────┐  │
//! │  │          RpcRouter → Dispatcher (scope + AuthStatus)            │  │
//! │  └──────────────────────────────┬──────────────────────────────────┘  │
//! │                                 │                                      │
//! │  ┌──────────────────────────────┴──────────────────────────────────┐  │
//! │  │        NamespaceRegistry: web3 (open), engine/eth (auth)        │  │
//! │  └─────────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Tokens
//!
//! HS256 JWTs signed with a 32-byte shared secret. Only `HS256` is accepted;
//! the `iat` claim must lie within the configured tolerance (default 5s) of
//! the server clock at receipt. Rejection reasons are logged and counted but
//! never returned to the caller.
//!
//! # Usage
//!
//! ```ignore
//! use qc_16_auth_gateway::{ApiDescriptor, GatewayConfig, GatewayNode, JwtSecret};
//!
//! let secret = JwtSecret::load_or_generate("jwtsecret")?;
//! let mut node = GatewayNode::new(GatewayConfig::default(), secret)?;
//! node.register_apis(vec![ApiDescriptor::new("engine", engine).authenticated()])?;
//! node.start().await?;
//! println!("{}", node.ws_auth_endpoint()?);
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod auth;
pub mod client;
pub mod domain;
pub mod middleware;
pub mod router;
pub mod rpc;
pub mod service;
pub mod ws;

// Re-exports for public API
pub use auth::{
    AuthHeaderProvider, JwtAuthProvider, JwtValidator, ProviderError, ProviderSequence,
    SkewedAuthProvider, UnsignedAuthProvider,
};
pub use client::{ClientError, RpcClient};
pub use domain::clock::{Clock, FixedClock, SystemClock};
pub use domain::config::GatewayConfig;
pub use domain::error::{ApiError, ApiResult, AuthDecision, AuthError, GatewayError};
pub use domain::secret::{JwtSecret, SecretError};
pub use middleware::AuthMetrics;
pub use rpc::{ApiDescriptor, AuthStatus, RpcService};
pub use service::GatewayNode;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client version string for web3_clientVersion
pub fn client_version() -> String {
    format!(
        "QuantumChain/v{}/{}/rust",
        VERSION,
        std::env::consts::OS
    )
}
