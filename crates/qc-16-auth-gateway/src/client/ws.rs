//! Persistent WebSocket transport. Authenticated once, at dial.

use crate::auth::provider::AuthHeaderProvider;
use crate::client::ClientError;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsTransport {
    stream: Mutex<Stream>,
}

impl WsTransport {
    /// Open the connection. `provider` is consulted exactly once, for the
    /// upgrade request.
    pub async fn connect(
        endpoint: &str,
        provider: Option<&dyn AuthHeaderProvider>,
    ) -> Result<Self, ClientError> {
        let mut request = endpoint
            .into_client_request()
            .map_err(|e| ClientError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if let Some(provider) = provider {
            provider.add_auth_header(request.headers_mut())?;
        }

        let (stream, response) = connect_async(request).await.map_err(|e| match e {
            tungstenite::Error::Http(response) => {
                warn!(endpoint = %endpoint, status = %response.status(), "WebSocket upgrade refused");
                ClientError::Dial(format!("upgrade refused with status {}", response.status()))
            }
            other => ClientError::Dial(other.to_string()),
        })?;
        debug!(endpoint = %endpoint, status = %response.status(), "WebSocket connected");

        Ok(Self {
            stream: Mutex::new(stream),
        })
    }

    /// Send one request and wait for the response carrying `id`.
    pub async fn request(&self, id: u64, body: &Value) -> Result<Value, ClientError> {
        let mut stream = self.stream.lock().await;
        stream
            .send(Message::text(body.to_string()))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        while let Some(message) = stream.next().await {
            let message = message.map_err(|e| ClientError::Transport(e.to_string()))?;
            let response: Value = match message {
                Message::Text(text) => serde_json::from_str(text.as_str()),
                Message::Binary(data) => serde_json::from_slice(&data),
                Message::Close(_) => return Err(ClientError::Closed),
                _ => continue,
            }
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

            match response.get("id") {
                Some(Value::Number(n)) if n.as_u64() == Some(id) => return Ok(response),
                // Envelope-level errors carry a null id
                Some(Value::Null) | None if response.get("error").is_some() => {
                    return Ok(response)
                }
                _ => debug!(id, "Skipping unrelated WebSocket message"),
            }
        }

        Err(ClientError::Closed)
    }

    pub async fn close(self) {
        let mut stream = self.stream.into_inner();
        if let Err(e) = stream.close(None).await {
            debug!(error = %e, "WebSocket close failed");
        }
    }
}
