//! Built-in `web3` namespace. Open on every listener.

use crate::domain::error::{ApiError, ApiResult};
use crate::rpc::{parse_param, RpcService};
use async_trait::async_trait;
use serde_json::Value;
use sha3::{Digest, Keccak256};

/// `web3_clientVersion` and `web3_sha3`
pub struct Web3Rpc {
    client_version: String,
}

impl Web3Rpc {
    pub fn new(client_version: impl Into<String>) -> Self {
        Self {
            client_version: client_version.into(),
        }
    }

    pub fn client_version(&self) -> &str {
        &self.client_version
    }

    /// Keccak-256 of hex-encoded input, hex-encoded with a `0x` prefix.
    pub fn sha3(&self, data: &str) -> ApiResult<String> {
        let raw = data
            .strip_prefix("0x")
            .or_else(|| data.strip_prefix("0X"))
            .ok_or_else(|| ApiError::invalid_params("hex string without 0x prefix"))?;
        let bytes = hex::decode(raw)?;
        Ok(format!("0x{}", hex::encode(Keccak256::digest(bytes))))
    }
}

#[async_trait]
impl RpcService for Web3Rpc {
    async fn call(&self, method: &str, params: Option<&Value>) -> ApiResult<Value> {
        match method {
            "clientVersion" => Ok(Value::String(self.client_version.clone())),
            "sha3" => {
                let data: String = parse_param(params, 0)?;
                self.sha3(&data).map(Value::String)
            }
            _ => Err(ApiError::method_not_found(&format!("web3_{}", method))),
        }
    }
}
