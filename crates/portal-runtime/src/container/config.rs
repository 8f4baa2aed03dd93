//! # Portal Configuration
//!
//! Runtime settings read from `SL_*` environment variables.
//!
//! ## Security Requirements
//!
//! - `jwt_secret` MUST NOT be the built-in development secret in production
//! - All limits have sane defaults with override capability

use portal_telemetry::parse_flag;
use sl_01_identity::{IdentityConfig, DEFAULT_TOKEN_TTL};
use sl_08_api_gateway::GatewayConfig;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Signing key used when `SL_JWT_SECRET` is not set.
pub const DEFAULT_JWT_SECRET: &str = "siteledger-development-secret-change-me";

/// Shortest signing key accepted outside insecure mode.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete runtime configuration.
#[derive(Clone, Default)]
pub struct PortalConfig {
    pub http: HttpSettings,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    /// First admin account, created on an empty store.
    pub admin: Option<AdminAccount>,
    /// Browser origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Upload ceiling in bytes; gateway default when unset.
    pub max_upload_bytes: Option<usize>,
    /// Rate-limit by `X-Forwarded-For` instead of the socket peer.
    pub trust_proxy: bool,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

#[derive(Clone)]
pub struct SecurityConfig {
    /// HMAC key for session tokens.
    pub jwt_secret: String,
    pub token_ttl: Duration,
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub secure_cookie: bool,
    /// Accept the development secret (`SL_ALLOW_INSECURE=1`).
    pub allow_insecure: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl: DEFAULT_TOKEN_TTL,
            secure_cookie: false,
            allow_insecure: false,
        }
    }
}

/// Where records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Everything in process memory; lost on exit.
    #[default]
    Memory,
    /// RocksDB records plus files on disk under the data directory.
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::RocksDb),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("records")
    }

    pub fn files_dir(&self) -> PathBuf {
        self.data_dir.join("files")
    }
}

#[derive(Clone)]
pub struct AdminAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("SL_ADMIN_EMAIL is set but SL_ADMIN_PASSWORD is missing")]
    MissingAdminPassword,

    #[error(
        "SECURITY VIOLATION: JWT secret is the built-in development value. \
         Set SL_JWT_SECRET or run with SL_ALLOW_INSECURE=1."
    )]
    InsecureJwtSecret,

    #[error("JWT secret must be at least 32 bytes, got {0}")]
    WeakJwtSecret(usize),
}

impl PortalConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source. Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = PortalConfig::default();

        if let Some(host) = var("SL_HTTP_HOST") {
            config.http.host = parse("SL_HTTP_HOST", &host)?;
        }
        if let Some(port) = var("SL_HTTP_PORT") {
            config.http.port = parse("SL_HTTP_PORT", &port)?;
        }

        if let Some(secret) = var("SL_JWT_SECRET") {
            config.security.jwt_secret = secret;
        }
        if let Some(ttl) = var("SL_TOKEN_TTL_SECS") {
            let secs: u64 = parse("SL_TOKEN_TTL_SECS", &ttl)?;
            if secs == 0 {
                return Err(invalid("SL_TOKEN_TTL_SECS", &ttl, "must be positive"));
            }
            config.security.token_ttl = Duration::from_secs(secs);
        }
        if let Some(flag) = var("SL_SECURE_COOKIE") {
            config.security.secure_cookie = parse_flag(&flag);
        }
        if let Some(flag) = var("SL_ALLOW_INSECURE") {
            config.security.allow_insecure = parse_flag(&flag);
        }

        if let Some(dir) = var("SL_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = var("SL_STORAGE_BACKEND") {
            config.storage.backend = parse("SL_STORAGE_BACKEND", &backend)?;
        }

        if let Some(email) = var("SL_ADMIN_EMAIL") {
            let password = var("SL_ADMIN_PASSWORD").ok_or(ConfigError::MissingAdminPassword)?;
            config.admin = Some(AdminAccount {
                name: var("SL_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password,
            });
        }

        if let Some(origins) = var("SL_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(bytes) = var("SL_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = Some(parse("SL_MAX_UPLOAD_BYTES", &bytes)?);
        }
        if let Some(flag) = var("SL_TRUST_PROXY") {
            config.trust_proxy = parse_flag(&flag);
        }

        Ok(config)
    }

    /// Refuse weak signing keys unless insecure mode was asked for.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.security.allow_insecure {
            return Ok(());
        }
        if self.security.jwt_secret == DEFAULT_JWT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }
        let len = self.security.jwt_secret.len();
        if len < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret(len));
        }
        Ok(())
    }

    pub fn identity_config(&self) -> IdentityConfig {
        IdentityConfig {
            jwt_secret: self.security.jwt_secret.clone(),
            token_ttl: self.security.token_ttl,
        }
    }

    /// Gateway settings: defaults overlaid with the environment.
    pub fn gateway_config(&self) -> GatewayConfig {
        let mut gateway = GatewayConfig::default();
        gateway.http.host = self.http.host;
        gateway.http.port = self.http.port;
        gateway.auth.secure_cookie = self.security.secure_cookie;
        gateway.auth.session_ttl = self.security.token_ttl;
        if !self.cors_origins.is_empty() {
            gateway.cors.allowed_origins = self.cors_origins.clone();
        }
        if let Some(max) = self.max_upload_bytes {
            gateway.limits.max_upload_size = max;
        }
        gateway.rate_limit.trust_forwarded = self.trust_proxy;
        gateway
    }
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalConfig")
            .field("http", &self.http)
            .field("storage", &self.storage)
            .field("token_ttl", &self.security.token_ttl)
            .field("secure_cookie", &self.security.secure_cookie)
            .field("allow_insecure", &self.security.allow_insecure)
            .field("admin", &self.admin.as_ref().map(|a| &a.email))
            .field("cors_origins", &self.cors_origins)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("trust_proxy", &self.trust_proxy)
            .finish_non_exhaustive()
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(var, value, e.to_string()))
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}
