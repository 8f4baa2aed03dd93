//! Document Forwarding System endpoints.

use super::{file_response, PageQuery, UploadForm};
use crate::domain::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use shared_types::{DocumentId, Page, PageRequest, UserId};
use sl_05_document_forwarding::{Document, DocumentStatus, NewDocument, TrailEntry};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DocumentQuery {
    pub status: Option<DocumentStatus>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ForwardRequest {
    pub to: UserId,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: DocumentStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// `POST /api/dfs` (multipart: `title`, `description`, `category`, `file`)
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    mut form: UploadForm,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let input = NewDocument {
        title: form.require_text("title")?,
        description: form.text("description"),
        category: form.text("category"),
    };
    let upload = form.take_file()?;
    let document = state.documents.upload(&actor, input, &upload)?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// `GET /api/dfs`: every document, admin only.
pub async fn list_all(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(q): ApiQuery<DocumentQuery>,
) -> ApiResult<Json<Page<Document>>> {
    let page = PageQuery {
        offset: q.offset,
        limit: q.limit,
    };
    Ok(Json(state.documents.list_all(&actor, q.status, page.into())?))
}

/// Documents currently held by the caller.
pub async fn inbox(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<Document>>> {
    Ok(Json(state.documents.inbox(&actor, page)?))
}

pub async fn uploaded(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<Document>>> {
    Ok(Json(state.documents.uploaded(&actor, page)?))
}

/// Documents the caller uploaded, held, or forwarded at some point.
pub async fn involved(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult<Json<Page<Document>>> {
    Ok(Json(state.documents.involved(&actor, page)?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.documents.get(&actor, id)?))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<StatusCode> {
    state.documents.delete(&actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn trail(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Json<Vec<TrailEntry>>> {
    Ok(Json(state.documents.trail(&actor, id)?))
}

pub async fn download(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Response> {
    let (file, bytes) = state.documents.download(&actor, id)?;
    Ok(file_response(file, bytes))
}

/// `POST /api/dfs/:id/forward`: hand custody to another staff member or admin.
pub async fn forward(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
    ApiJson(body): ApiJson<ForwardRequest>,
) -> ApiResult<Json<Document>> {
    let document = state.documents.forward(&actor, id, body.to, body.note)?;
    Ok(Json(document))
}

/// `POST /api/dfs/:id/status`
pub async fn set_status(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> ApiResult<Json<Document>> {
    let document = state
        .documents
        .set_status(&actor, id, body.status, body.note)?;
    Ok(Json(document))
}
