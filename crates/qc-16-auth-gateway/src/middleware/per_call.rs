//! Per-request authentication for HTTP on the authenticated listener.
//!
//! Every request carries its own token and is validated independently; a
//! prior success grants nothing to the next request on the same connection.

use crate::auth::header::bearer_token;
use crate::auth::validator::JwtValidator;
use crate::domain::clock::Clock;
use crate::domain::error::{ApiError, AuthError};
use crate::middleware::metrics::AuthMetrics;
use crate::rpc::AuthStatus;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    response::Response,
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Authentication layer for the HTTP side of the authenticated listener
#[derive(Clone)]
pub struct PerCallAuthLayer {
    validator: Arc<JwtValidator>,
    clock: Arc<dyn Clock>,
    metrics: Arc<AuthMetrics>,
}

impl PerCallAuthLayer {
    pub fn new(validator: Arc<JwtValidator>, clock: Arc<dyn Clock>, metrics: Arc<AuthMetrics>) -> Self {
        Self {
            validator,
            clock,
            metrics,
        }
    }

    /// Validate the headers of one request.
    pub fn check<B>(&self, req: &Request<B>) -> Result<(), AuthError> {
        let token = bearer_token(req.headers())?;
        self.validator.validate(token, self.clock.now()).map(|_| ())
    }
}

impl<S> Layer<S> for PerCallAuthLayer {
    type Service = PerCallAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PerCallAuthService {
            inner,
            gate: self.clone(),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct PerCallAuthService<S> {
    inner: S,
    gate: PerCallAuthLayer,
}

impl<S> Service<Request<Body>> for PerCallAuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let decision = self.gate.check(&req);
        let metrics = Arc::clone(&self.gate.metrics);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match decision {
                Ok(()) => {
                    metrics.record_http_accepted();
                    debug!("Request authenticated");
                    req.extensions_mut().insert(AuthStatus::Authenticated);
                    inner.call(req).await
                }
                Err(reason) => {
                    metrics.record_http_rejected(reason);
                    warn!(reason = reason.as_str(), "Rejected unauthenticated request");
                    Ok(unauthorized_response())
                }
            }
        })
    }
}

/// 401 with a JSON-RPC error body. The body never names the failure reason.
pub fn unauthorized_response() -> Response {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "error": ApiError::unauthorized(),
        "id": null
    });

    let mut response = Response::new(Body::from(serde_json::to_vec(&body).unwrap_or_default()));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));

    response
}
