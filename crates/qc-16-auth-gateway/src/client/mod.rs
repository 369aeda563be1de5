//! JSON-RPC client for both transports.
//!
//! The endpoint scheme picks the transport. Credentials come from an
//! [`AuthHeaderProvider`]: over HTTP it is asked before every request, over
//! WebSocket once while dialing.

pub mod http;
pub mod ws;

use crate::auth::provider::{AuthHeaderProvider, ProviderError};
use crate::domain::error::ApiError;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use self::http::HttpTransport;
pub use self::ws::WsTransport;

/// Client failures
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// No provider for an authenticated dial, WebSocket handshake refused, or
    /// connection could not be opened
    #[error("dial failed: {0}")]
    Dial(String),
    /// HTTP request refused by the authentication gate
    #[error("unauthorized")]
    Unauthorized,
    #[error("credential provider failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i32, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("connection closed")]
    Closed,
}

enum Transport {
    Http(HttpTransport),
    Ws(WsTransport),
}

/// A connected (WebSocket) or lazily connecting (HTTP) RPC client.
pub struct RpcClient {
    transport: Transport,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Dial without credentials.
    pub async fn dial(endpoint: &str) -> Result<Self, ClientError> {
        Self::connect(endpoint, None).await
    }

    /// Dial an authenticated endpoint.
    ///
    /// A missing provider fails the dial on either transport, before any
    /// connection is attempted.
    pub async fn dial_with_auth(
        endpoint: &str,
        provider: Option<Arc<dyn AuthHeaderProvider>>,
    ) -> Result<Self, ClientError> {
        let provider = provider
            .ok_or_else(|| ClientError::Dial(format!("no auth provider for {}", endpoint)))?;
        Self::connect(endpoint, Some(provider)).await
    }

    async fn connect(
        endpoint: &str,
        provider: Option<Arc<dyn AuthHeaderProvider>>,
    ) -> Result<Self, ClientError> {
        let (scheme, _) = endpoint
            .split_once("://")
            .ok_or_else(|| ClientError::InvalidEndpoint(endpoint.to_string()))?;

        let transport = match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Transport::Http(HttpTransport::new(endpoint, provider)?),
            "ws" | "wss" => Transport::Ws(WsTransport::connect(endpoint, provider.as_deref()).await?),
            _ => {
                return Err(ClientError::InvalidEndpoint(format!(
                    "unsupported scheme {:?}",
                    scheme
                )))
            }
        };

        Ok(Self {
            transport,
            next_id: AtomicU64::new(1),
        })
    }

    /// Call `method` and decode its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = match &self.transport {
            Transport::Http(http) => http.request(&request).await?,
            Transport::Ws(ws) => ws.request(id, &request).await?,
        };
        decode_response(response)
    }

    /// Close the underlying connection, if any.
    pub async fn close(self) {
        if let Transport::Ws(ws) = self.transport {
            ws.close().await;
        }
    }
}

fn decode_response<T: DeserializeOwned>(mut response: Value) -> Result<T, ClientError> {
    if let Some(error) = response.get_mut("error").map(Value::take) {
        let error: ApiError = serde_json::from_value(error)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        return Err(ClientError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let result = response
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| ClientError::InvalidResponse("missing result".to_string()))?;
    serde_json::from_value(result).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}
