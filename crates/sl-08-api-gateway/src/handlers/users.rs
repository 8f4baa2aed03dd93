//! Account management (admin only, except reading one's own profile).

use super::{blocking, PageQuery};
use crate::domain::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use shared_types::{Page, Role, UserId};
use sl_01_identity::{NewUser, UserUpdate, UserView};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordReset {
    pub new_password: String,
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(q): ApiQuery<UserQuery>,
) -> ApiResult<Json<Page<UserView>>> {
    let page = PageQuery {
        offset: q.offset,
        limit: q.limit,
    };
    let users = state.identity.list_users(&actor, q.role, page.into())?;
    Ok(Json(users))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(body): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let identity = state.identity.clone();
    let user = blocking(move || identity.create_user(&actor, body)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.identity.get_user(&actor, id)?))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<UserUpdate>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.identity.update_user(&actor, id, body)?))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<StatusCode> {
    state.identity.delete_user(&actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/users/:id/password`
pub async fn reset_password(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<PasswordReset>,
) -> ApiResult<StatusCode> {
    let identity = state.identity.clone();
    blocking(move || identity.reset_password(&actor, id, &body.new_password)).await?;
    Ok(StatusCode::NO_CONTENT)
}
