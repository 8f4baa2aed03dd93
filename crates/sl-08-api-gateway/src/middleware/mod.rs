//! Middleware stack for the gateway.
//!
//! Layer order (outer → inner): CORS → Tracing → Timeout → RateLimit → BodyLimit → Handler
//!
//! Requests rejected by an inner layer still pass back through the tracing
//! layer, so every response is counted and logged.

pub mod body_limit;
pub mod cors;
pub mod rate_limit;
pub mod timeout;
pub mod tracing;

pub use body_limit::BodyLimitLayer;
pub use cors::create_cors_layer;
pub use rate_limit::{RateLimitLayer, RateLimitState};
pub use timeout::TimeoutLayer;
pub use self::tracing::{TracingLayer, REQUEST_ID_HEADER};

use crate::domain::config::GatewayConfig;
use std::sync::Arc;

/// Middleware stack builder
pub struct MiddlewareStack {
    pub tracing: TracingLayer,
    pub timeout: TimeoutLayer,
    pub rate_limit: RateLimitLayer,
    pub body_limit: BodyLimitLayer,
}

impl MiddlewareStack {
    /// Create middleware stack from gateway config
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            tracing: TracingLayer::new(),
            timeout: TimeoutLayer::new(config.timeouts.clone()),
            rate_limit: RateLimitLayer::new(config.rate_limit.clone()),
            body_limit: BodyLimitLayer::new(config.limits.clone()),
        }
    }

    /// Get rate limit state for cleanup task
    pub fn rate_limit_state(&self) -> Arc<RateLimitState> {
        self.rate_limit.state()
    }
}
