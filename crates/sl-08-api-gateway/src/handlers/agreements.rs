//! Client agreements: issue, review and sign.

use super::{file_response, PageQuery, UploadForm};
use crate::domain::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use shared_types::{AgreementId, Cid, Page, UserId};
use sl_06_agreements::{Agreement, AgreementFilter, AgreementStatus, NewAgreement};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AgreementQuery {
    pub status: Option<AgreementStatus>,
    pub cid: Option<Cid>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub signer_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(q): ApiQuery<AgreementQuery>,
) -> ApiResult<Json<Page<Agreement>>> {
    let filter = AgreementFilter {
        status: q.status,
        cid: q.cid,
    };
    let page = PageQuery {
        offset: q.offset,
        limit: q.limit,
    };
    Ok(Json(state.agreements.list(&actor, &filter, page.into())?))
}

/// `POST /api/agreements` (multipart: `client_id`, `title`, `description`, `file`)
pub async fn issue(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    mut form: UploadForm,
) -> ApiResult<(StatusCode, Json<Agreement>)> {
    let client_id: UserId = form
        .require_text("client_id")?
        .parse()
        .map_err(|_| ApiError::invalid("client_id is not a valid id"))?;
    let input = NewAgreement {
        client_id,
        title: form.require_text("title")?,
        description: form.text("description"),
    };
    let upload = form.take_file()?;
    let agreement = state.agreements.issue(&actor, input, &upload)?;
    Ok((StatusCode::CREATED, Json(agreement)))
}

/// `GET /api/agreements/:id`: the addressed client's first read marks it viewed.
pub async fn open(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<AgreementId>,
) -> ApiResult<Json<Agreement>> {
    Ok(Json(state.agreements.open(&actor, id)?))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<AgreementId>,
) -> ApiResult<StatusCode> {
    state.agreements.delete(&actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<AgreementId>,
) -> ApiResult<Response> {
    let (file, bytes) = state.agreements.download(&actor, id)?;
    Ok(file_response(file, bytes))
}

pub async fn sign(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<AgreementId>,
    ApiJson(body): ApiJson<SignRequest>,
) -> ApiResult<Json<Agreement>> {
    Ok(Json(state.agreements.sign(&actor, id, &body.signer_name)?))
}

pub async fn reject(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<AgreementId>,
    ApiJson(body): ApiJson<RejectRequest>,
) -> ApiResult<Json<Agreement>> {
    Ok(Json(state.agreements.reject(&actor, id, &body.reason)?))
}

pub async fn withdraw(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<AgreementId>,
) -> ApiResult<Json<Agreement>> {
    Ok(Json(state.agreements.withdraw(&actor, id)?))
}
