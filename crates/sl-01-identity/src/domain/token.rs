//! HS256 session tokens.

use super::errors::IdentityError;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared_types::{Cid, Role, Timestamp, UserId};
use std::time::Duration;

/// Default session lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Settings for the identity service.
#[derive(Clone)]
pub struct IdentityConfig {
    /// HMAC key for session tokens.
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<Cid>,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens.
///
/// Expiry is checked against the caller-supplied instant rather than the
/// wall clock so it follows the service's `TimeSource`.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &IdentityConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            ttl: config.token_ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `sub`, returning it with its expiry.
    pub fn issue(
        &self,
        sub: UserId,
        role: Role,
        cid: Option<Cid>,
        now: Timestamp,
    ) -> Result<(String, Timestamp), IdentityError> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| IdentityError::Invalid(format!("token ttl: {e}")))?;
        let expires_at = now + ttl;
        let claims = Claims {
            sub,
            role,
            cid,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IdentityError::Invalid(format!("token encoding: {e}")))?;
        Ok((token, expires_at))
    }

    /// Check signature and expiry.
    pub fn verify(&self, token: &str, now: Timestamp) -> Result<Claims, IdentityError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                _ => IdentityError::InvalidToken,
            })?;
        if data.claims.exp <= now.timestamp() {
            return Err(IdentityError::TokenExpired);
        }
        Ok(data.claims)
    }
}
