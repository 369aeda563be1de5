//! Request spans for every listener.

use axum::{body::Body, http::Request, response::Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{info_span, Instrument, Span};

/// Tracing layer that creates spans for each request
#[derive(Clone)]
pub struct TracingLayer {
    listener: &'static str,
}

impl TracingLayer {
    /// `listener` names the endpoint in every span, e.g. `"http"` or `"auth"`.
    pub fn new(listener: &'static str) -> Self {
        Self { listener }
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService {
            inner,
            listener: self.listener,
        }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
    listener: &'static str,
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();

        let span = info_span!(
            "api_request",
            listener = self.listener,
            http.method = %req.method(),
            http.target = %req.uri().path(),
            upgrade = is_websocket_upgrade(&req),
            http.status = tracing::field::Empty,
        );

        if let Some(parent) = extract_trace_context(&req) {
            span.follows_from(parent);
        }

        Box::pin(
            async move {
                let result = inner.call(req).await;
                if let Ok(response) = &result {
                    Span::current().record("http.status", response.status().as_u16());
                }
                result
            }
            .instrument(span),
        )
    }
}

fn is_websocket_upgrade<B>(req: &Request<B>) -> bool {
    req.headers()
        .get(axum::http::header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Extract trace context from request headers (W3C Trace Context)
fn extract_trace_context<B>(req: &Request<B>) -> Option<Span> {
    let traceparent = req.headers().get("traceparent")?.to_str().ok()?;

    // version-trace_id-parent_id-trace_flags
    let parts: Vec<&str> = traceparent.split('-').collect();
    if parts.len() != 4 {
        return None;
    }

    Some(info_span!(
        "parent_trace",
        trace_id = parts[1],
        parent_span_id = parts[2]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traceparent_parsing() {
        let req = Request::builder()
            .header(
                "traceparent",
                "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01",
            )
            .body(Body::empty())
            .unwrap();

        assert!(extract_trace_context(&req).is_some());
    }

    #[test]
    fn test_invalid_traceparent() {
        let req = Request::builder()
            .header("traceparent", "invalid")
            .body(Body::empty())
            .unwrap();

        assert!(extract_trace_context(&req).is_none());
    }

    #[test]
    fn test_upgrade_detection() {
        let req = Request::builder()
            .header("upgrade", "WebSocket")
            .body(Body::empty())
            .unwrap();
        assert!(is_websocket_upgrade(&req));

        let req = Request::builder().body(Body::empty()).unwrap();
        assert!(!is_websocket_upgrade(&req));
    }
}
