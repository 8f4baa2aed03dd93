//! Request body size limits.
//!
//! JSON bodies are buffered up to `max_request_size`. Multipart bodies are
//! checked against `max_upload_size` by declared length here and streamed
//! through `DefaultBodyLimit` by the multipart extractor.

use super::timeout::is_multipart;
use crate::domain::config::LimitsConfig;
use crate::domain::error::ApiError;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::warn;

/// Body limit layer
#[derive(Clone)]
pub struct BodyLimitLayer {
    config: Arc<LimitsConfig>,
}

impl BodyLimitLayer {
    pub fn new(config: LimitsConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for BodyLimitLayer {
    type Service = BodyLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BodyLimitService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Body limit service
#[derive(Clone)]
pub struct BodyLimitService<S> {
    inner: S,
    config: Arc<LimitsConfig>,
}

impl<S> Service<Request<Body>> for BodyLimitService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let multipart = is_multipart(&req);
            let limit = if multipart {
                config.max_upload_size
            } else {
                config.max_request_size
            };

            // Fast path: declared length
            if let Some(len) = declared_length(&req) {
                if len > limit {
                    warn!(size = len, max = limit, "Request too large (from header)");
                    return Ok(ApiError::payload_too_large(limit).into_response());
                }
            }

            if multipart {
                return inner.call(req).await;
            }

            let (parts, body) = req.into_parts();
            match to_bytes(body, limit).await {
                Ok(bytes) => inner.call(Request::from_parts(parts, Body::from(bytes))).await,
                Err(e) => {
                    warn!(error = %e, max = limit, "Failed to read request body");
                    Ok(ApiError::payload_too_large(limit).into_response())
                }
            }
        })
    }
}

fn declared_length<B>(req: &Request<B>) -> Option<usize> {
    req.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
