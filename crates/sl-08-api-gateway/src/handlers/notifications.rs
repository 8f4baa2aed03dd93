//! Per-user notification inbox and admin broadcasts.

use super::PageQuery;
use crate::domain::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use shared_types::{NotificationId, Page, Role};
use sl_07_notifications::Notification;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotificationQuery {
    pub unread: bool,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    /// Restrict to one role; everyone when absent.
    #[serde(default)]
    pub role: Option<Role>,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: usize,
}

#[derive(Debug, Serialize)]
pub struct Updated {
    pub updated: usize,
}

#[derive(Debug, Serialize)]
pub struct Delivered {
    pub delivered: usize,
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(q): ApiQuery<NotificationQuery>,
) -> ApiResult<Json<Page<Notification>>> {
    let page = PageQuery {
        offset: q.offset,
        limit: q.limit,
    };
    Ok(Json(state.notifications.list(&actor, q.unread, page.into())?))
}

pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> ApiResult<Json<UnreadCount>> {
    let unread = state.notifications.unread_count(&actor)?;
    Ok(Json(UnreadCount { unread }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<NotificationId>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(state.notifications.mark_read(&actor, id)?))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> ApiResult<Json<Updated>> {
    let updated = state.notifications.mark_all_read(&actor)?;
    Ok(Json(Updated { updated }))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<NotificationId>,
) -> ApiResult<StatusCode> {
    state.notifications.delete(&actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/notifications/broadcast`
pub async fn broadcast(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(body): ApiJson<BroadcastRequest>,
) -> ApiResult<Json<Delivered>> {
    let delivered =
        state
            .notifications
            .broadcast(&actor, body.role, &body.title, &body.message)?;
    Ok(Json(Delivered { delivered }))
}
