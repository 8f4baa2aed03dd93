//! Telemetry configuration from environment variables.

use std::env;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// `EnvFilter` directive (trace, debug, info, warn, error, or per-target)
    pub log_level: String,

    /// Emit one JSON object per line instead of the pretty console format
    pub json_logs: bool,

    /// Colourise pretty output
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "siteledger".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SL_SERVICE_NAME`: Service name (default: siteledger)
    /// - `SL_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `SL_JSON_LOGS`: JSON logs (default: false in dev, true in containers)
    /// - `NO_COLOR`: Disable ANSI colours when set
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("SL_SERVICE_NAME")
                .unwrap_or_else(|_| "siteledger".to_string()),

            log_level: env::var("SL_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("SL_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            ansi: env::var("NO_COLOR").is_err(),
        }
    }
}

/// `1`, `true`, `yes` and `on` (any case) are true.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
