//! Stateless HTTP transport. Each request carries a fresh credential.

use crate::auth::provider::AuthHeaderProvider;
use crate::client::ClientError;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    client: reqwest::Client,
    url: reqwest::Url,
    provider: Option<Arc<dyn AuthHeaderProvider>>,
}

impl HttpTransport {
    /// No connection is made until the first request.
    pub fn new(
        endpoint: &str,
        provider: Option<Arc<dyn AuthHeaderProvider>>,
    ) -> Result<Self, ClientError> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| ClientError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url,
            provider,
        })
    }

    pub async fn request(&self, body: &Value) -> Result<Value, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(provider) = &self.provider {
            provider.add_auth_header(&mut headers)?;
        }

        let response = self
            .client
            .post(self.url.clone())
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(url = %self.url, status = %status, "HTTP RPC response");
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("status {}: {}", status, e)))
    }
}
