//! WebSocket connection loop.
//!
//! Authentication, if any, happened at the upgrade. Every message on the
//! connection dispatches with the status fixed by the handshake.

use crate::domain::error::ApiError;
use crate::middleware::metrics::AuthMetrics;
use crate::router::{error_response, RpcRouter};
use crate::ws::gate::WsSession;
use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default maximum message size (1MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// WebSocket connection handler
pub struct WebSocketHandler {
    session: WsSession,
    router: RpcRouter,
    metrics: Arc<AuthMetrics>,
    max_message_size: usize,
}

impl WebSocketHandler {
    pub fn new(session: WsSession, router: RpcRouter, metrics: Arc<AuthMetrics>) -> Self {
        Self {
            session,
            router,
            metrics,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Check message size, returns error response if too large
    fn check_message_size(&self, size: usize) -> Option<String> {
        if size > self.max_message_size {
            warn!(
                connection_id = %self.session.id(),
                size = size,
                max = self.max_message_size,
                "Message exceeds size limit"
            );
            Some(
                error_response(
                    Value::Null,
                    &ApiError::limit_exceeded(format!(
                        "message of {} bytes (max: {})",
                        size, self.max_message_size
                    )),
                )
                .to_string(),
            )
        } else {
            None
        }
    }

    /// Serve the connection until the peer closes it or the socket fails.
    pub async fn handle(mut self, mut socket: WebSocket) {
        self.metrics.record_ws_connect();
        info!(
            connection_id = %self.session.id(),
            status = ?self.session.status(),
            "New WebSocket connection"
        );

        while let Some(result) = socket.next().await {
            let text = match result {
                Ok(Message::Text(text)) => text,
                Ok(Message::Binary(data)) => match String::from_utf8(data) {
                    Ok(text) => text,
                    Err(_) => {
                        debug!(connection_id = %self.session.id(), "Ignoring non-UTF-8 binary frame");
                        continue;
                    }
                },
                // Pongs are queued by the socket itself
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(_)) => {
                    debug!(connection_id = %self.session.id(), "WebSocket close received");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "WebSocket error");
                    break;
                }
            };

            let response = match self.check_message_size(text.len()) {
                Some(error_response) => error_response,
                None => self.handle_message(&text).await,
            };

            if let Err(e) = socket.send(Message::Text(response)).await {
                error!(error = %e, "Failed to send WebSocket response");
                break;
            }
        }

        self.session.close();
        self.metrics.record_ws_disconnect();
        info!(
            connection_id = %self.session.id(),
            "WebSocket connection closed"
        );
    }

    async fn handle_message(&self, text: &str) -> String {
        self.router
            .handle_body(text, self.session.status())
            .await
            .to_string()
    }
}
