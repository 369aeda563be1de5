//! # Listener Behavior
//!
//! The plain listeners never see a credential, so authenticated namespaces are
//! refused there even when whitelisted. Open namespaces answer everywhere.

#[cfg(test)]
mod tests {
    use crate::integration::{start_node, HelloRpc};
    use qc_16_auth_gateway::{
        client_version, ApiDescriptor, ClientError, GatewayError, JwtAuthProvider, JwtSecret,
        RpcClient,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;

    const UNAUTHORIZED: i32 = -32010;

    #[tokio::test]
    async fn test_plain_listeners_refuse_authenticated_namespaces() {
        let mut node = start_node(JwtSecret::random()).await;

        for endpoint in [node.http_endpoint().unwrap(), node.ws_endpoint().unwrap()] {
            let client = RpcClient::dial(&endpoint).await.unwrap();
            match client.call::<String>("engine_helloWorld", json!([])).await {
                Err(ClientError::Rpc { code, .. }) => assert_eq!(code, UNAUTHORIZED, "{endpoint}"),
                other => panic!("{endpoint}: expected rpc error, got {other:?}"),
            }
            client.close().await;
        }

        node.close().await;
    }

    #[tokio::test]
    async fn test_open_namespace_served_everywhere() {
        let secret = JwtSecret::random();
        let mut node = start_node(secret.clone()).await;

        for endpoint in [node.http_endpoint().unwrap(), node.ws_endpoint().unwrap()] {
            let client = RpcClient::dial(&endpoint).await.unwrap();
            let version: String = client.call("web3_clientVersion", json!([])).await.unwrap();
            assert_eq!(version, client_version());
        }

        for endpoint in [
            node.http_auth_endpoint().unwrap(),
            node.ws_auth_endpoint().unwrap(),
        ] {
            let client =
                RpcClient::dial_with_auth(&endpoint, Some(Arc::new(JwtAuthProvider::new(secret.clone()))))
                    .await
                    .unwrap();
            let hash: String = client
                .call("web3_sha3", json!(["0x68656c6c6f20776f726c64"]))
                .await
                .unwrap();
            assert_eq!(
                hash,
                "0x47173285a8d7341e5e972fc677286384f802f8ef42a5ec5f03bbfa254cb01fad"
            );
            client.close().await;
        }

        node.close().await;
    }

    #[tokio::test]
    async fn test_unknown_namespace_on_auth_listener() {
        let secret = JwtSecret::random();
        let mut node = start_node(secret.clone()).await;

        let client = RpcClient::dial_with_auth(
            &node.http_auth_endpoint().unwrap(),
            Some(Arc::new(JwtAuthProvider::new(secret))),
        )
        .await
        .unwrap();
        match client.call::<Value>("debug_traceBlock", json!([])).await {
            Err(ClientError::Rpc { code, .. }) => assert_eq!(code, -32601),
            other => panic!("expected method not found, got {other:?}"),
        }

        node.close().await;
    }

    #[tokio::test]
    async fn test_auth_listener_rejects_missing_token() {
        let mut node = start_node(JwtSecret::random()).await;
        let endpoint = node.http_auth_endpoint().unwrap();

        let response = reqwest::Client::new()
            .post(&endpoint)
            .header("content-type", "application/json")
            .body(r#"{"jsonrpc":"2.0","id":1,"method":"engine_helloWorld","params":[]}"#)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("www-authenticate").unwrap(),
            "Bearer"
        );
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], UNAUTHORIZED);
        // The rejection reason is never disclosed.
        assert!(!body.to_string().contains("credential"));

        node.close().await;
    }

    #[tokio::test]
    async fn test_health_on_plain_http() {
        let mut node = start_node(JwtSecret::random()).await;
        let endpoint = node.http_endpoint().unwrap();

        let response = reqwest::get(format!("{}/health", endpoint.trim_end_matches('/')))
            .await
            .unwrap();
        assert!(response.status().is_success());

        node.close().await;
    }

    #[tokio::test]
    async fn test_register_after_start_fails() {
        let mut node = start_node(JwtSecret::random()).await;

        let late = node.register_apis(vec![ApiDescriptor::new(
            "debug",
            Arc::new(HelloRpc("too late")),
        )]);
        assert!(matches!(late, Err(GatewayError::AlreadyStarted)));

        node.close().await;
        assert!(!node.is_running());
    }
}
