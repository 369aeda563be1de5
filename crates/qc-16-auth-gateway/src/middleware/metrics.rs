//! Authentication counters.
//!
//! Rejections are counted per [`AuthError`] so operators can tell a
//! misconfigured secret from clock drift without raising log verbosity.

use crate::domain::error::AuthError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Gateway authentication metrics
#[derive(Debug, Default)]
pub struct AuthMetrics {
    // Per-request gate
    pub http_accepted: AtomicU64,
    pub http_rejected: AtomicU64,

    // Connect-time gate
    pub ws_handshakes_accepted: AtomicU64,
    pub ws_handshakes_rejected: AtomicU64,
    pub websocket_connections: AtomicU64,

    // Rejections by reason
    pub malformed_token: AtomicU64,
    pub algorithm_not_allowed: AtomicU64,
    pub bad_signature: AtomicU64,
    pub missing_claim: AtomicU64,
    pub clock_skew_exceeded: AtomicU64,
    pub no_credential_presented: AtomicU64,
}

impl AuthMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an authenticated HTTP request
    pub fn record_http_accepted(&self) {
        self.http_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a refused HTTP request
    pub fn record_http_rejected(&self, reason: AuthError) {
        self.http_rejected.fetch_add(1, Ordering::Relaxed);
        self.record_reason(reason);
    }

    /// Record an accepted WebSocket handshake
    pub fn record_ws_accepted(&self) {
        self.ws_handshakes_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a refused WebSocket handshake
    pub fn record_ws_rejected(&self, reason: AuthError) {
        self.ws_handshakes_rejected.fetch_add(1, Ordering::Relaxed);
        self.record_reason(reason);
    }

    /// Record WebSocket connection
    pub fn record_ws_connect(&self) {
        self.websocket_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record WebSocket disconnection
    pub fn record_ws_disconnect(&self) {
        self.websocket_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn reason_counter(&self, reason: AuthError) -> &AtomicU64 {
        match reason {
            AuthError::MalformedToken => &self.malformed_token,
            AuthError::AlgorithmNotAllowed => &self.algorithm_not_allowed,
            AuthError::BadSignature => &self.bad_signature,
            AuthError::MissingClaim => &self.missing_claim,
            AuthError::ClockSkewExceeded => &self.clock_skew_exceeded,
            AuthError::NoCredentialPresented => &self.no_credential_presented,
        }
    }

    fn record_reason(&self, reason: AuthError) {
        self.reason_counter(reason).fetch_add(1, Ordering::Relaxed);
    }

    /// Rejections recorded for `reason` on either transport
    pub fn rejections(&self, reason: AuthError) -> u64 {
        self.reason_counter(reason).load(Ordering::Relaxed)
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "http": {
                "accepted": self.http_accepted.load(Ordering::Relaxed),
                "rejected": self.http_rejected.load(Ordering::Relaxed),
            },
            "websocket": {
                "accepted": self.ws_handshakes_accepted.load(Ordering::Relaxed),
                "rejected": self.ws_handshakes_rejected.load(Ordering::Relaxed),
                "connections": self.websocket_connections.load(Ordering::Relaxed),
            },
            "rejections": {
                "malformed_token": self.malformed_token.load(Ordering::Relaxed),
                "algorithm_not_allowed": self.algorithm_not_allowed.load(Ordering::Relaxed),
                "bad_signature": self.bad_signature.load(Ordering::Relaxed),
                "missing_claim": self.missing_claim.load(Ordering::Relaxed),
                "clock_skew_exceeded": self.clock_skew_exceeded.load(Ordering::Relaxed),
                "no_credential_presented": self.no_credential_presented.load(Ordering::Relaxed),
            }
        })
    }
}
