//! # Portal Telemetry
//!
//! Logging and metrics for the SiteLedger portal.
//!
//! - **Logs**: `tracing` events through a `tracing-subscriber` registry,
//!   pretty on a terminal and JSON in containers.
//! - **Metrics**: a Prometheus registry scraped from `GET /metrics`.
//!
//! Domain crates only use `tracing` macros; they never depend on this crate.
//! The runtime installs the subscriber, and the gateway and runtime feed
//! the metrics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portal_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SL_SERVICE_NAME` | `siteledger` | Service name in log lines |
//! | `SL_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `SL_JSON_LOGS` | `false` (`true` in containers) | JSON output |

mod config;
mod logging;
pub mod metrics;

pub use config::{parse_flag, TelemetryConfig};
pub use metrics::{
    encode_metrics, record_event, record_http, register_metrics, AGREEMENTS_SIGNED,
    BILLS_SUBMITTED, DOCUMENTS_FORWARDED, DOCUMENTS_UPLOADED, LOGIN_FAILURES,
    NOTIFICATIONS_DELIVERED, PAYMENTS_REQUESTED, PORTAL_EVENTS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the global tracing subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    logging::init_logging(config)
}
