//! Client bills: submission, review and payment.

use super::{file_response, PageQuery, UploadForm};
use crate::domain::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use shared_types::{BillId, Cid, Decision, Page};
use sl_03_billing::{Bill, BillFilter, BillStatus, BillUpdate, NewBill};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BillQuery {
    pub status: Option<BillStatus>,
    pub cid: Option<Cid>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: Decision,
    #[serde(default)]
    pub remarks: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(q): ApiQuery<BillQuery>,
) -> ApiResult<Json<Page<Bill>>> {
    let filter = BillFilter {
        status: q.status,
        cid: q.cid,
    };
    let page = PageQuery {
        offset: q.offset,
        limit: q.limit,
    };
    Ok(Json(state.billing.list(&actor, &filter, page.into())?))
}

pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(body): ApiJson<NewBill>,
) -> ApiResult<(StatusCode, Json<Bill>)> {
    let bill = state.billing.submit(&actor, body)?;
    Ok((StatusCode::CREATED, Json(bill)))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<BillId>,
) -> ApiResult<Json<Bill>> {
    Ok(Json(state.billing.get(&actor, id)?))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<BillId>,
    ApiJson(body): ApiJson<BillUpdate>,
) -> ApiResult<Json<Bill>> {
    Ok(Json(state.billing.update(&actor, id, body)?))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<BillId>,
) -> ApiResult<StatusCode> {
    state.billing.delete(&actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/bills/:id/review`
pub async fn review(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<BillId>,
    ApiJson(body): ApiJson<ReviewRequest>,
) -> ApiResult<Json<Bill>> {
    let bill = state
        .billing
        .review(&actor, id, body.decision, body.remarks)?;
    Ok(Json(bill))
}

/// `POST /api/bills/:id/paid`
pub async fn mark_paid(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<BillId>,
) -> ApiResult<Json<Bill>> {
    Ok(Json(state.billing.mark_paid(&actor, id)?))
}

/// `POST /api/bills/:id/attachment` (multipart, field `file`)
pub async fn attach(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<BillId>,
    mut form: UploadForm,
) -> ApiResult<Json<Bill>> {
    let upload = form.take_file()?;
    Ok(Json(state.billing.attach(&actor, id, &upload)?))
}

/// `GET /api/bills/:id/attachment`
pub async fn attachment(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<BillId>,
) -> ApiResult<Response> {
    let (file, bytes) = state.billing.attachment(&actor, id)?;
    Ok(file_response(file, bytes))
}
