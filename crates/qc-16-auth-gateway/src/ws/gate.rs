//! Connect-time authentication for the WebSocket side of the authenticated
//! listener.
//!
//! A connection is validated exactly once, on the upgrade request. An accepted
//! connection is served until close without re-validation, so a token that
//! ages past the tolerance mid-session does not interrupt it. A refused upgrade
//! is answered with 401 instead of 101 and the dial fails.

use crate::auth::header::bearer_token;
use crate::auth::validator::JwtValidator;
use crate::domain::clock::Clock;
use crate::domain::connection::ConnectionId;
use crate::domain::error::AuthError;
use crate::middleware::metrics::AuthMetrics;
use crate::rpc::AuthStatus;
use http::HeaderMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Lifecycle of one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgrade received on the authenticated listener, not yet validated
    AwaitingHandshake,
    /// Handshake accepted
    Authenticated,
    /// Handshake refused; never upgraded
    Rejected(AuthError),
    /// Plain listener connection; no handshake applies
    Anonymous,
    /// Connection ended
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    #[error("handshake refused: {0}")]
    Refused(#[from] AuthError),
    #[error("handshake already performed, connection is {0:?}")]
    AlreadyPerformed(ConnectionState),
}

/// Per-connection state.
#[derive(Debug)]
pub struct WsSession {
    id: ConnectionId,
    state: ConnectionState,
}

impl WsSession {
    /// New connection on the authenticated listener.
    pub fn new() -> Self {
        Self {
            id: ConnectionId::new(),
            state: ConnectionState::AwaitingHandshake,
        }
    }

    /// New connection on a plain listener.
    pub fn anonymous() -> Self {
        Self {
            id: ConnectionId::new(),
            state: ConnectionState::Anonymous,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Status handed to the dispatcher for every call on this connection.
    pub fn status(&self) -> AuthStatus {
        match self.state {
            ConnectionState::Authenticated => AuthStatus::Authenticated,
            _ => AuthStatus::Anonymous,
        }
    }

    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }
}

impl Default for WsSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates upgrade requests on the authenticated listener.
#[derive(Clone)]
pub struct ConnectTimeGate {
    validator: Arc<JwtValidator>,
    clock: Arc<dyn Clock>,
    metrics: Arc<AuthMetrics>,
}

impl ConnectTimeGate {
    pub fn new(validator: Arc<JwtValidator>, clock: Arc<dyn Clock>, metrics: Arc<AuthMetrics>) -> Self {
        Self {
            validator,
            clock,
            metrics,
        }
    }

    /// Validate the upgrade headers and move `session` out of
    /// `AwaitingHandshake`.
    pub fn handshake(&self, session: &mut WsSession, headers: &HeaderMap) -> Result<(), HandshakeError> {
        if session.state != ConnectionState::AwaitingHandshake {
            return Err(HandshakeError::AlreadyPerformed(session.state));
        }

        let outcome = bearer_token(headers)
            .and_then(|token| self.validator.validate(token, self.clock.now()).map(|_| ()));

        match outcome {
            Ok(()) => {
                session.state = ConnectionState::Authenticated;
                self.metrics.record_ws_accepted();
                info!(connection_id = %session.id, "WebSocket handshake authenticated");
                Ok(())
            }
            Err(reason) => {
                session.state = ConnectionState::Rejected(reason);
                self.metrics.record_ws_rejected(reason);
                warn!(
                    connection_id = %session.id,
                    reason = reason.as_str(),
                    "Rejected WebSocket handshake"
                );
                Err(HandshakeError::Refused(reason))
            }
        }
    }
}
