//! JSON-RPC services and namespace dispatch.
//!
//! Services are registered per namespace. Each namespace declares whether it
//! requires an authenticated caller; the dispatcher enforces that flag on
//! every listener.

pub mod dispatch;
pub mod registry;
pub mod web3;

pub use dispatch::{AuthStatus, Dispatcher, ListenerScope};
pub use registry::{ApiDescriptor, NamespaceRegistry};
pub use web3::Web3Rpc;

use crate::domain::error::{ApiError, ApiResult};
use async_trait::async_trait;

/// A namespace's method table.
///
/// `method` is the part after the namespace separator, e.g. `helloWorld` for
/// `engine_helloWorld`.
#[async_trait]
pub trait RpcService: Send + Sync {
    async fn call(
        &self,
        method: &str,
        params: Option<&serde_json::Value>,
    ) -> ApiResult<serde_json::Value>;
}

/// Parse a required parameter from JSON-RPC params array.
pub fn parse_param<T: serde::de::DeserializeOwned>(
    params: Option<&serde_json::Value>,
    index: usize,
) -> ApiResult<T> {
    let param = params
        .and_then(|p| {
            if p.is_array() {
                p.get(index)
            } else if index == 0 {
                Some(p)
            } else {
                None
            }
        })
        .ok_or_else(|| ApiError::invalid_params(format!("missing parameter at index {}", index)))?;

    serde_json::from_value(param.clone())
        .map_err(|e| ApiError::invalid_params(format!("invalid parameter at index {}: {}", index, e)))
}
