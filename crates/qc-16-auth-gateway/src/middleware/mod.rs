//! Middleware for the gateway listeners.
//!
//! Layer order on the authenticated HTTP route: Tracing → PerCallAuth → Handler.
//! The WebSocket upgrade route on the same listener is gated by
//! [`crate::ws::ConnectTimeGate`] instead.

pub mod metrics;
pub mod per_call;
pub mod tracing;

pub use metrics::AuthMetrics;
pub use per_call::{unauthorized_response, PerCallAuthLayer, PerCallAuthService};
pub use tracing::TracingLayer;
