//! Gateway configuration and error types.

pub mod config;
pub mod error;

pub use config::{
    AuthConfig, ConfigError, CorsConfig, GatewayConfig, HttpConfig, LimitsConfig,
    RateLimitConfig, TimeoutConfig,
};
pub use error::{ApiError, ApiResult, GatewayError};
