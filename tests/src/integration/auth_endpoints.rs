//! # Authenticated Endpoint Table
//!
//! Drives both authenticated endpoints of a live node through the same set of
//! credential providers:
//!
//! - WebSocket authenticates once, at dial: a bad credential fails the dial,
//!   and a good one keeps the connection usable whatever the provider does
//!   afterwards.
//! - HTTP authenticates every request: a bad credential fails the call, and the
//!   client stays usable for the next one.

#[cfg(test)]
mod tests {
    use crate::integration::start_node;
    use qc_16_auth_gateway::{
        AuthError, AuthHeaderProvider, ClientError, GatewayNode, JwtAuthProvider, JwtSecret,
        ProviderSequence, RpcClient, SkewedAuthProvider, UnsignedAuthProvider,
    };
    use serde_json::json;
    use std::sync::Arc;

    // Inside the 5s tolerance with room for request latency
    const NOT_TOO_LONG: i64 = 3;
    // Outside it even after a second of in-flight time
    const TOO_LONG: i64 = 7;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Clone, Copy, PartialEq)]
    enum Transport {
        Ws,
        Http,
    }

    struct AuthCase {
        name: &'static str,
        transport: Transport,
        provider: Option<Arc<dyn AuthHeaderProvider>>,
        expect_dial_fail: bool,
        expect_call1_fail: bool,
        expect_call2_fail: bool,
    }

    impl AuthCase {
        fn new(
            name: &'static str,
            transport: Transport,
            provider: Option<Arc<dyn AuthHeaderProvider>>,
        ) -> Self {
            Self {
                name,
                transport,
                provider,
                expect_dial_fail: false,
                expect_call1_fail: false,
                expect_call2_fail: false,
            }
        }

        fn dial_fails(mut self) -> Self {
            self.expect_dial_fail = true;
            self
        }

        fn call1_fails(mut self) -> Self {
            self.expect_call1_fail = true;
            self
        }

        fn call2_fails(mut self) -> Self {
            self.expect_call2_fail = true;
            self
        }

        async fn run(self, node: &GatewayNode) {
            let endpoint = match self.transport {
                Transport::Ws => node.ws_auth_endpoint().unwrap(),
                Transport::Http => node.http_auth_endpoint().unwrap(),
            };

            let dialed = RpcClient::dial_with_auth(&endpoint, self.provider).await;
            if self.expect_dial_fail {
                assert!(
                    matches!(dialed, Err(ClientError::Dial(_))),
                    "{}: expected initial dial to fail",
                    self.name
                );
                return;
            }
            let client = dialed.unwrap_or_else(|e| panic!("{}: dial failed: {e}", self.name));

            let first = client.call::<String>("engine_helloWorld", json!([])).await;
            if self.expect_call1_fail {
                assert!(
                    matches!(first, Err(ClientError::Unauthorized)),
                    "{}: expected call 1 to fail, got {first:?}",
                    self.name
                );
                // The client is still usable after a refused call.
                let again = client.call::<String>("engine_helloWorld", json!([])).await;
                assert!(again.is_err(), "{}: provider did not change", self.name);
                return;
            }
            assert_eq!(
                first.unwrap_or_else(|e| panic!("{}: call 1 failed: {e}", self.name)),
                "hello engine",
                "{}",
                self.name
            );

            let second = client.call::<String>("eth_helloWorld", json!([])).await;
            if self.expect_call2_fail {
                assert!(
                    matches!(second, Err(ClientError::Unauthorized)),
                    "{}: expected call 2 to fail, got {second:?}",
                    self.name
                );
                return;
            }
            assert_eq!(
                second.unwrap_or_else(|e| panic!("{}: call 2 failed: {e}", self.name)),
                "hello eth",
                "{}",
                self.name
            );

            client.close().await;
        }
    }

    fn good(secret: &JwtSecret) -> Arc<dyn AuthHeaderProvider> {
        Arc::new(JwtAuthProvider::new(secret.clone()))
    }

    fn bad() -> Arc<dyn AuthHeaderProvider> {
        Arc::new(JwtAuthProvider::new(JwtSecret::random()))
    }

    fn none() -> Arc<dyn AuthHeaderProvider> {
        Arc::new(UnsignedAuthProvider::new())
    }

    fn offset(secret: &JwtSecret, secs: i64) -> Arc<dyn AuthHeaderProvider> {
        Arc::new(SkewedAuthProvider::new(secret.clone(), secs))
    }

    fn changing(providers: Vec<Arc<dyn AuthHeaderProvider>>) -> Arc<dyn AuthHeaderProvider> {
        Arc::new(ProviderSequence::new(providers).unwrap())
    }

    fn secret_from_file() -> (tempfile::TempDir, JwtSecret) {
        // The node reads its secret from a file, never from memory.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jwt_secret");
        JwtSecret::random().write_to(&path).unwrap();
        let secret = JwtSecret::from_file(&path).unwrap();
        (dir, secret)
    }

    // =============================================================================
    // INTEGRATION TESTS: AUTHENTICATED ENDPOINTS
    // =============================================================================

    #[tokio::test]
    async fn test_auth_endpoints() {
        let (_dir, secret) = secret_from_file();
        let mut node = start_node(secret.clone()).await;

        assert_ne!(node.ws_endpoint().unwrap(), node.ws_auth_endpoint().unwrap());
        assert_ne!(
            node.http_endpoint().unwrap(),
            node.http_auth_endpoint().unwrap()
        );

        use Transport::{Http, Ws};
        let cases = vec![
            // Auth works
            AuthCase::new("ws good", Ws, Some(good(&secret))),
            AuthCase::new("http good", Http, Some(good(&secret))),
            // No provider at all
            AuthCase::new("ws nil auth provider", Ws, None).dial_fails(),
            AuthCase::new("http nil auth provider", Http, None).dial_fails(),
            // Signed with another secret
            AuthCase::new("ws bad", Ws, Some(bad())).dial_fails(),
            AuthCase::new("http bad", Http, Some(bad())).call1_fails(),
            // Unsigned tokens are never accepted
            AuthCase::new("ws none", Ws, Some(none())).dial_fails(),
            AuthCase::new("http none", Http, Some(none())).call1_fails(),
            // Outside the tolerance, either direction
            AuthCase::new("ws too old", Ws, Some(offset(&secret, -TOO_LONG))).dial_fails(),
            AuthCase::new("http too old", Http, Some(offset(&secret, -TOO_LONG))).call1_fails(),
            AuthCase::new("ws too new", Ws, Some(offset(&secret, TOO_LONG))).dial_fails(),
            AuthCase::new("http too new", Http, Some(offset(&secret, TOO_LONG))).call1_fails(),
            // Skewed, but within bounds
            AuthCase::new("ws old", Ws, Some(offset(&secret, -NOT_TOO_LONG))),
            AuthCase::new("http old", Http, Some(offset(&secret, -NOT_TOO_LONG))),
            AuthCase::new("ws new", Ws, Some(offset(&secret, NOT_TOO_LONG))),
            AuthCase::new("http new", Http, Some(offset(&secret, NOT_TOO_LONG))),
            // WebSocket only authenticates on dial
            AuthCase::new("ws single auth", Ws, Some(changing(vec![good(&secret), bad()]))),
            AuthCase::new(
                "http call fail auth",
                Http,
                Some(changing(vec![good(&secret), bad()])),
            )
            .call2_fails(),
            AuthCase::new(
                "http call fail time",
                Http,
                Some(changing(vec![good(&secret), offset(&secret, TOO_LONG)])),
            )
            .call2_fails(),
        ];

        for case in cases {
            case.run(&node).await;
        }

        node.close().await;
    }

    #[tokio::test]
    async fn test_http_recovers_after_rejection() {
        let secret = JwtSecret::random();
        let mut node = start_node(secret.clone()).await;
        let endpoint = node.http_auth_endpoint().unwrap();

        let client = RpcClient::dial_with_auth(
            &endpoint,
            Some(changing(vec![good(&secret), bad(), good(&secret)])),
        )
        .await
        .unwrap();

        let first: String = client.call("engine_helloWorld", json!([])).await.unwrap();
        assert_eq!(first, "hello engine");
        assert!(matches!(
            client.call::<String>("engine_helloWorld", json!([])).await,
            Err(ClientError::Unauthorized)
        ));
        let third: String = client.call("eth_helloWorld", json!([])).await.unwrap();
        assert_eq!(third, "hello eth");

        node.close().await;
    }

    #[tokio::test]
    async fn test_rejections_are_counted_by_reason() {
        let secret = JwtSecret::random();
        let mut node = start_node(secret.clone()).await;
        let metrics = node.metrics();

        let ws = node.ws_auth_endpoint().unwrap();
        assert!(RpcClient::dial_with_auth(&ws, Some(none())).await.is_err());
        assert!(RpcClient::dial_with_auth(&ws, Some(bad())).await.is_err());

        // A plain dial sends no credential at all.
        let http = RpcClient::dial(&node.http_auth_endpoint().unwrap())
            .await
            .unwrap();
        assert!(http
            .call::<String>("engine_helloWorld", json!([]))
            .await
            .is_err());

        assert_eq!(metrics.rejections(AuthError::AlgorithmNotAllowed), 1);
        assert_eq!(metrics.rejections(AuthError::BadSignature), 1);
        assert_eq!(metrics.rejections(AuthError::NoCredentialPresented), 1);

        node.close().await;
    }
}
