//! Request extractors with JSON error bodies, and the authenticated caller.

use crate::domain::config::AuthConfig;
use crate::domain::error::ApiError;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue};
use shared_types::Actor;

/// `axum::Json` with `ApiError` rejections.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with `ApiError` rejections.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` with `ApiError` rejections.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// The caller, resolved from the session cookie or a bearer token.
///
/// The token is re-checked against the identity store on every request, so
/// disabled or deleted accounts lose access immediately.
pub struct CurrentUser(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = session_token(&parts.headers, &state.auth.cookie_name)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        let actor = state.identity.authenticate(&token)?;
        Ok(CurrentUser(actor))
    }
}

/// Bearer token wins over the cookie when both are present.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(config: &AuthConfig, token: &str) -> Option<HeaderValue> {
    cookie(config, token, config.session_ttl.as_secs())
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie(config: &AuthConfig) -> Option<HeaderValue> {
    cookie(config, "", 0)
}

fn cookie(config: &AuthConfig, value: &str, max_age: u64) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        config.cookie_name, value, max_age
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}
