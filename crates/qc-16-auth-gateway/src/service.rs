//! Gateway node: listener lifecycle and endpoint discovery.
//!
//! Three listeners are bound on start:
//! - plain HTTP (`POST /`, `GET /health`, `GET /metrics`), anonymous callers only
//! - plain WebSocket (`GET /` upgrade), anonymous callers only
//! - authenticated, serving `POST /` behind the per-request gate and the
//!   `GET /` upgrade behind the connect-time gate

use crate::auth::validator::JwtValidator;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::config::GatewayConfig;
use crate::domain::error::{ApiError, GatewayError};
use crate::domain::secret::JwtSecret;
use crate::middleware::{unauthorized_response, AuthMetrics, PerCallAuthLayer, TracingLayer};
use crate::router::{error_response, RpcRouter};
use crate::rpc::{ApiDescriptor, AuthStatus, Dispatcher, ListenerScope, NamespaceRegistry, Web3Rpc};
use crate::ws::{ConnectTimeGate, WebSocketHandler, WsSession};
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    handler::Handler,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long `close` waits for each listener to drain
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Addresses the listeners actually bound to.
#[derive(Debug, Clone, Copy)]
struct BoundAddrs {
    http: Option<SocketAddr>,
    ws: Option<SocketAddr>,
    auth: SocketAddr,
}

struct Running {
    addrs: BoundAddrs,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(&'static str, JoinHandle<std::io::Result<()>>)>,
}

/// A JSON-RPC node with plain and authenticated endpoints.
pub struct GatewayNode {
    config: GatewayConfig,
    validator: Arc<JwtValidator>,
    clock: Arc<dyn Clock>,
    metrics: Arc<AuthMetrics>,
    /// `None` once started; the registry is frozen into the listeners
    registry: RwLock<Option<NamespaceRegistry>>,
    running: Option<Running>,
}

impl GatewayNode {
    /// Create a node. The built-in `web3` namespace is registered here.
    pub fn new(config: GatewayConfig, secret: JwtSecret) -> Result<Self, GatewayError> {
        config.validate()?;

        let validator = Arc::new(JwtValidator::new(
            secret,
            config.auth.clock_skew_tolerance,
        ));

        let mut registry = NamespaceRegistry::new();
        registry.register(ApiDescriptor::new(
            "web3",
            Arc::new(Web3Rpc::new(crate::client_version())),
        ))?;

        Ok(Self {
            config,
            validator,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(AuthMetrics::new()),
            registry: RwLock::new(Some(registry)),
            running: None,
        })
    }

    /// Replace the clock the gates validate against.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register services. Only valid before [`start`](Self::start).
    pub fn register_apis(&self, apis: Vec<ApiDescriptor>) -> Result<(), GatewayError> {
        let mut guard = self.registry.write();
        let registry = guard.as_mut().ok_or(GatewayError::AlreadyStarted)?;
        for api in apis {
            info!(
                namespace = %api.namespace,
                version = %api.version,
                authenticated = api.authenticated,
                "Registering API"
            );
            registry.register(api)?;
        }
        Ok(())
    }

    /// Bind all listeners and start serving in background tasks.
    ///
    /// Nothing is served until every socket is bound and the endpoints are
    /// known to be distinct. On failure the node is left unstarted and can be
    /// started again.
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        let registry = self
            .registry
            .read()
            .as_ref()
            .cloned()
            .ok_or(GatewayError::AlreadyStarted)?;
        let registry = Arc::new(registry);

        info!(namespaces = ?registry.namespaces(), "Starting gateway node...");
        let http = if self.config.http.enabled {
            Some(bind(self.config.http_addr()).await?)
        } else {
            None
        };
        let ws = if self.config.websocket.enabled {
            Some(bind(self.config.ws_addr()).await?)
        } else {
            None
        };
        let auth = bind(self.config.auth_addr()).await?;

        let addrs = BoundAddrs {
            http: http.as_ref().map(|(_, addr)| *addr),
            ws: ws.as_ref().map(|(_, addr)| *addr),
            auth: auth.1,
        };
        check_distinct(&addrs)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();

        if let Some((listener, addr)) = http {
            info!(addr = %addr, "HTTP server listening");
            let router = self.build_http_router(&registry);
            handles.push(("http", serve(listener, router, shutdown_rx.clone())));
        }
        if let Some((listener, addr)) = ws {
            info!(addr = %addr, "WebSocket server listening");
            let router = self.build_ws_router(&registry);
            handles.push(("ws", serve(listener, router, shutdown_rx.clone())));
        }
        let (listener, addr) = auth;
        info!(addr = %addr, "Authenticated server listening");
        let router = self.build_auth_router(&registry);
        handles.push(("auth", serve(listener, router, shutdown_rx)));

        // Frozen from here on
        *self.registry.write() = None;
        self.running = Some(Running {
            addrs,
            shutdown_tx,
            handles,
        });
        info!("Gateway node started");
        Ok(())
    }

    /// Stop all listeners and wait for them to drain.
    pub async fn close(&mut self) {
        if let Some(running) = self.running.take() {
            info!("Stopping gateway node");
            shutdown(running).await;
            info!("Gateway node stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<AuthMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn addrs(&self) -> Result<BoundAddrs, GatewayError> {
        self.running
            .as_ref()
            .map(|r| r.addrs)
            .ok_or(GatewayError::NotStarted)
    }

    /// Plain HTTP endpoint, `http://host:port`
    pub fn http_endpoint(&self) -> Result<String, GatewayError> {
        let addr = self.addrs()?.http.ok_or(GatewayError::ListenerDisabled("http"))?;
        Ok(format!("http://{}", addr))
    }

    /// Plain WebSocket endpoint, `ws://host:port`
    pub fn ws_endpoint(&self) -> Result<String, GatewayError> {
        let addr = self.addrs()?.ws.ok_or(GatewayError::ListenerDisabled("ws"))?;
        Ok(format!("ws://{}", addr))
    }

    /// Authenticated HTTP endpoint
    pub fn http_auth_endpoint(&self) -> Result<String, GatewayError> {
        Ok(format!("http://{}", self.addrs()?.auth))
    }

    /// Authenticated WebSocket endpoint; same socket as the HTTP one
    pub fn ws_auth_endpoint(&self) -> Result<String, GatewayError> {
        Ok(format!("ws://{}", self.addrs()?.auth))
    }

    fn listener_state(
        &self,
        registry: &Arc<NamespaceRegistry>,
        scope: ListenerScope,
    ) -> ListenerState {
        let dispatcher = Dispatcher::new(Arc::clone(registry), scope);
        ListenerState {
            router: RpcRouter::new(dispatcher, self.config.http.max_batch_size),
            gate: ConnectTimeGate::new(
                Arc::clone(&self.validator),
                Arc::clone(&self.clock),
                Arc::clone(&self.metrics),
            ),
            metrics: Arc::clone(&self.metrics),
            max_message_size: self.config.websocket.max_message_size,
        }
    }

    /// Build HTTP router for JSON-RPC
    fn build_http_router(&self, registry: &Arc<NamespaceRegistry>) -> Router {
        let state = self.listener_state(
            registry,
            ListenerScope::modules(self.config.http.modules.iter().cloned()),
        );

        Router::new()
            .route("/", post(handle_json_rpc))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics_handler))
            .layer(TracingLayer::new("http"))
            .with_state(state)
    }

    /// Build WebSocket router
    fn build_ws_router(&self, registry: &Arc<NamespaceRegistry>) -> Router {
        let state = self.listener_state(
            registry,
            ListenerScope::modules(self.config.websocket.modules.iter().cloned()),
        );

        Router::new()
            .route("/", get(ws_upgrade))
            .layer(TracingLayer::new("ws"))
            .with_state(state)
    }

    /// Build the authenticated router. Both routes share `/`: the upgrade is
    /// gated once per connection, POST once per request.
    fn build_auth_router(&self, registry: &Arc<NamespaceRegistry>) -> Router {
        let state = self.listener_state(registry, ListenerScope::All);
        let per_call = PerCallAuthLayer::new(
            Arc::clone(&self.validator),
            Arc::clone(&self.clock),
            Arc::clone(&self.metrics),
        );

        Router::new()
            .route(
                "/",
                get(ws_auth_upgrade).post(handle_json_rpc.layer(per_call)),
            )
            .layer(TracingLayer::new("auth"))
            .with_state(state)
    }
}

impl Drop for GatewayNode {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            let _ = running.shutdown_tx.send(true);
        }
    }
}

/// Bind `addr` and resolve the address actually bound (port 0 is ephemeral).
async fn bind(addr: SocketAddr) -> Result<(TcpListener, SocketAddr), GatewayError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| GatewayError::Bind { addr, source })?;
    let bound = listener
        .local_addr()
        .map_err(|source| GatewayError::Bind { addr, source })?;
    Ok((listener, bound))
}

fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<std::io::Result<()>> {
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                // Sender dropped counts as shutdown too
                let _ = shutdown_rx.changed().await;
            })
            .await
    })
}

async fn shutdown(running: Running) {
    let _ = running.shutdown_tx.send(true);
    for (name, handle) in running.handles {
        match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => error!(listener = name, error = %e, "Server error"),
            Ok(Err(e)) => error!(listener = name, error = %e, "Server task failed"),
            Err(_) => warn!(listener = name, "Server did not drain in time"),
        }
    }
}

/// The authenticated listener must not share an address with a plain one.
fn check_distinct(addrs: &BoundAddrs) -> Result<(), GatewayError> {
    for (transport, plain) in [("http", addrs.http), ("ws", addrs.ws)] {
        if plain == Some(addrs.auth) {
            return Err(GatewayError::EndpointCollision {
                transport,
                endpoint: addrs.auth.to_string(),
            });
        }
    }
    Ok(())
}

/// Application state shared across handlers of one listener
#[derive(Clone)]
struct ListenerState {
    router: RpcRouter,
    gate: ConnectTimeGate,
    metrics: Arc<AuthMetrics>,
    max_message_size: usize,
}

/// Handle JSON-RPC request.
///
/// Only the per-request gate inserts `AuthStatus`; without it the caller is
/// anonymous.
async fn handle_json_rpc(
    State(state): State<ListenerState>,
    status: Option<Extension<AuthStatus>>,
    body: String,
) -> impl IntoResponse {
    let status = status
        .map(|Extension(status)| status)
        .unwrap_or(AuthStatus::Anonymous);

    let request: serde_json::Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(
                    serde_json::Value::Null,
                    &ApiError::parse_error(e.to_string()),
                )),
            );
        }
    };

    (
        StatusCode::OK,
        Json(state.router.handle_value(request, status).await),
    )
}

/// Upgrade on a plain listener; no credential is inspected.
async fn ws_upgrade(State(state): State<ListenerState>, ws: WebSocketUpgrade) -> Response {
    let handler = WebSocketHandler::new(WsSession::anonymous(), state.router, state.metrics)
        .with_max_message_size(state.max_message_size);
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handler.handle(socket))
}

/// Upgrade on the authenticated listener. A refused handshake answers 401 and
/// the connection is never upgraded.
async fn ws_auth_upgrade(
    State(state): State<ListenerState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let mut session = WsSession::new();
    if state.gate.handshake(&mut session, &headers).is_err() {
        return unauthorized_response();
    }

    let handler = WebSocketHandler::new(session, state.router, state.metrics)
        .with_max_message_size(state.max_message_size);
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handler.handle(socket))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "auth-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Authentication counters as JSON
async fn metrics_handler(State(state): State<ListenerState>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}
