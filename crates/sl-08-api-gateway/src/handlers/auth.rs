//! Login, logout and self-service account endpoints.

use super::blocking;
use crate::domain::error::ApiResult;
use crate::extract::{clear_cookie, session_cookie, ApiJson, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use sl_01_identity::{IdentityError, UserView};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Response> {
    let identity = state.identity.clone();
    let email = body.email.clone();
    let session = blocking(move || {
        identity.login(&body.email, &body.password).inspect_err(|e| {
            if matches!(
                e,
                IdentityError::InvalidCredentials | IdentityError::AccountDisabled
            ) {
                portal_telemetry::LOGIN_FAILURES.inc();
            }
        })
    })
    .await
    .inspect_err(|e| warn!(email = %email, code = e.code, "Login failed"))?;

    info!(user_id = %session.user.id, role = %session.user.role, "Login succeeded");
    let mut response = Json(&session).into_response();
    if let Some(cookie) = session_cookie(&state.auth, &session.token) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// `POST /api/auth/logout`
///
/// Tokens are stateless; logging out only drops the cookie.
pub async fn logout(State(state): State<AppState>) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Some(cookie) = clear_cookie(&state.auth) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

/// `GET /api/auth/me`
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> ApiResult<Json<UserView>> {
    let user = state.identity.get_user(&actor, actor.user_id)?;
    Ok(Json(user))
}

/// `PUT /api/auth/password`
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(body): ApiJson<PasswordChange>,
) -> ApiResult<StatusCode> {
    let identity = state.identity.clone();
    blocking(move || {
        identity.change_password(&actor, &body.current_password, &body.new_password)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
