//! Gateway configuration.
//!
//! Every section deserializes with defaults, so a partial JSON or TOML
//! document only has to name what it changes. Durations accept `"250ms"`,
//! `"30s"`, `"5m"`, `"2h"` or bare seconds.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub limits: LimitsConfig,
    pub timeouts: TimeoutConfig,
    pub cors: CorsConfig,
}

impl GatewayConfig {
    /// Reject settings the server cannot run with. Called once before
    /// binding.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rate_limit.validate()?;
        self.limits.validate()?;

        if self.timeouts.default.is_zero() || self.timeouts.upload.is_zero() {
            return Err(ConfigError::InvalidTimeout("timeouts cannot be 0".into()));
        }

        let cookie = &self.auth.cookie_name;
        if cookie.is_empty() || !cookie.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(ConfigError::Invalid(format!(
                "cookie name {cookie:?} must be ASCII alphanumeric"
            )));
        }

        // Browsers refuse credentialed responses to wildcard CORS.
        if self.cors.enabled && self.cors.allow_credentials {
            let wildcard = |v: &[String]| v.iter().any(|s| s == "*");
            if wildcard(&self.cors.allowed_origins) || wildcard(&self.cors.allowed_headers) {
                return Err(ConfigError::Invalid(
                    "credentialed CORS needs explicit origins and headers".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

/// The HttpOnly session cookie set at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    /// Adds `Secure`; turn on for HTTPS deployments.
    pub secure_cookie: bool,
    /// Cookie `Max-Age`. Kept equal to the token lifetime.
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "token".to_string(),
            secure_cookie: false,
            session_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Per-IP token buckets.
///
/// Requests fall into three classes: reads (GET, HEAD, OPTIONS), writes
/// (everything else) and logins. Logins get their own per-minute quota so
/// password guessing is throttled long before the write quota would be.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub reads_per_second: u32,
    pub read_burst: u32,
    pub writes_per_second: u32,
    pub write_burst: u32,
    /// Login attempts per minute per IP, also the burst.
    pub logins_per_minute: u32,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`. Only
    /// safe behind a reverse proxy that overwrites those headers.
    pub trust_forwarded: bool,
    /// Never limited.
    pub whitelist: Vec<IpAddr>,
    /// Buckets idle this long are swept.
    #[serde(with = "humantime_serde")]
    pub bucket_idle: Duration,
}

impl RateLimitConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let quotas = [
            ("reads_per_second", self.reads_per_second),
            ("read_burst", self.read_burst),
            ("writes_per_second", self.writes_per_second),
            ("write_burst", self.write_burst),
            ("logins_per_minute", self.logins_per_minute),
        ];
        match quotas.iter().find(|(_, v)| *v == 0) {
            Some((name, _)) if self.enabled => {
                Err(ConfigError::InvalidRateLimit(format!("{name} cannot be 0")))
            }
            _ => Ok(()),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reads_per_second: 50,
            read_burst: 100,
            writes_per_second: 10,
            write_burst: 20,
            logins_per_minute: 10,
            trust_forwarded: false,
            whitelist: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
            bucket_idle: Duration::from_secs(600),
        }
    }
}

/// Body caps. JSON routes get the small one, multipart routes the large.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_request_size: usize,
    pub max_upload_size: usize,
}

impl LimitsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit("max_request_size cannot be 0".into()));
        }
        if self.max_upload_size < self.max_request_size {
            return Err(ConfigError::InvalidLimit(
                "max_upload_size cannot be below max_request_size".into(),
            ));
        }
        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024,
            max_upload_size: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(with = "humantime_serde")]
    pub default: Duration,
    /// Multipart requests, which stream whole files.
    #[serde(with = "humantime_serde")]
    pub upload: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(15),
            upload: Duration::from_secs(120),
        }
    }
}

/// Cross-origin access for the browser front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    /// `"*"` allows any origin, but not together with credentials.
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    /// Preflight cache, in seconds.
    pub max_age: u64,
    /// Needed for the session cookie to travel cross-origin.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Content-Type", "Authorization", "X-Request-Id"]
                .map(String::from)
                .to_vec(),
            expose_headers: vec!["X-Request-Id".to_string(), "Content-Disposition".to_string()],
            max_age: 3600,
            allow_credentials: true,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `Duration` as a human-readable string.
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    const UNITS: [(&str, u64); 4] = [("ms", 1), ("s", 1_000), ("m", 60_000), ("h", 3_600_000)];

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let text = if duration.subsec_millis() == 0 {
            format!("{}s", duration.as_secs())
        } else {
            format!("{}ms", duration.as_millis())
        };
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_duration(&text).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(text: &str) -> Result<Duration, String> {
        let text = text.trim();
        // "ms" must be tried before "m" and "s".
        let (number, millis_per_unit) = UNITS
            .iter()
            .find_map(|(suffix, scale)| text.strip_suffix(suffix).map(|n| (n, *scale)))
            .unwrap_or((text, 1_000));
        number
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(millis_per_unit))
            .map(Duration::from_millis)
            .ok_or_else(|| format!("invalid duration {text:?}"))
    }
}
