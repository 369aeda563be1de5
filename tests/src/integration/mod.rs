//! Integration tests against a running `GatewayNode`.

pub mod auth_endpoints;
pub mod listeners;

use async_trait::async_trait;
use qc_16_auth_gateway::{
    ApiDescriptor, ApiError, ApiResult, GatewayConfig, GatewayNode, JwtSecret, RpcService,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Answers `<namespace>_helloWorld` with a fixed greeting.
pub struct HelloRpc(pub &'static str);

#[async_trait]
impl RpcService for HelloRpc {
    async fn call(&self, method: &str, _params: Option<&Value>) -> ApiResult<Value> {
        match method {
            "helloWorld" => Ok(json!(self.0)),
            _ => Err(ApiError::method_not_found(method)),
        }
    }
}

/// Loopback config on ephemeral ports, with `eth` and `engine` whitelisted on
/// the plain listeners.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.http.port = 0;
    config.websocket.port = 0;
    config.auth.port = 0;
    config.http.modules = vec!["web3".into(), "eth".into(), "engine".into()];
    config.websocket.modules = vec!["web3".into(), "eth".into(), "engine".into()];
    config
}

/// Start a node serving authenticated `engine` and `eth` namespaces.
pub async fn start_node(secret: JwtSecret) -> GatewayNode {
    let mut node = GatewayNode::new(test_config(), secret).expect("valid config");
    node.register_apis(vec![
        ApiDescriptor::new("engine", Arc::new(HelloRpc("hello engine"))).authenticated(),
        ApiDescriptor::new("eth", Arc::new(HelloRpc("hello eth"))).authenticated(),
    ])
    .expect("fresh namespaces");
    node.start().await.expect("node starts");
    node
}
