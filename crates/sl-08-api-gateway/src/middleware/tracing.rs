//! Request tracing middleware.
//!
//! Wraps every request in an `api_request` span carrying a request id,
//! echoes the id back in `x-request-id`, and records the outcome in the
//! HTTP metrics.

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    response::Response,
};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{info, info_span, warn, Instrument, Span};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied request id we propagate.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
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

        let request_id = request_id(&req);
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let span = info_span!(
            "api_request",
            request_id = %request_id,
            http.method = %method,
            http.target = %path,
            http.status_code = tracing::field::Empty,
        );

        Box::pin(
            async move {
                let started = Instant::now();
                let result = inner.call(req).await;
                let elapsed = started.elapsed();

                if let Ok(response) = &result {
                    let status = response.status();
                    Span::current().record("http.status_code", status.as_u16());
                    portal_telemetry::record_http(
                        method.as_str(),
                        status.as_u16(),
                        elapsed.as_secs_f64(),
                    );
                    let latency_ms = elapsed.as_millis() as u64;
                    if status.is_server_error() {
                        warn!(status = status.as_u16(), latency_ms, "Request failed");
                    } else {
                        info!(status = status.as_u16(), latency_ms, "Request served");
                    }
                }

                result.map(|mut response| {
                    if let Ok(value) = HeaderValue::from_str(&request_id) {
                        response.headers_mut().insert(REQUEST_ID_HEADER, value);
                    }
                    response
                })
            }
            .instrument(span),
        )
    }
}

/// Caller-supplied `x-request-id`, or a fresh UUID.
fn request_id<B>(req: &Request<B>) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
