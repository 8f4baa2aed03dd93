//! Reimbursement and advance requests.

use super::PageQuery;
use crate::domain::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use shared_types::{Cid, Decision, Page, PaymentId};
use sl_04_payments::{NewPaymentRequest, PaymentFilter, PaymentKind, PaymentRequest, PaymentStatus};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaymentQuery {
    pub status: Option<PaymentStatus>,
    pub kind: Option<PaymentKind>,
    pub cid: Option<Cid>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(q): ApiQuery<PaymentQuery>,
) -> ApiResult<Json<Page<PaymentRequest>>> {
    let filter = PaymentFilter {
        status: q.status,
        kind: q.kind,
        cid: q.cid,
    };
    let page = PageQuery {
        offset: q.offset,
        limit: q.limit,
    };
    Ok(Json(state.payments.list(&actor, &filter, page.into())?))
}

pub async fn request(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(body): ApiJson<NewPaymentRequest>,
) -> ApiResult<(StatusCode, Json<PaymentRequest>)> {
    let payment = state.payments.request(&actor, body)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<PaymentId>,
) -> ApiResult<Json<PaymentRequest>> {
    Ok(Json(state.payments.get(&actor, id)?))
}

/// `DELETE /api/payments/:id`: the owner withdraws a pending request.
pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<PaymentId>,
) -> ApiResult<StatusCode> {
    state.payments.cancel(&actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/payments/:id/decision`
pub async fn decide(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<PaymentId>,
    ApiJson(body): ApiJson<DecisionRequest>,
) -> ApiResult<Json<PaymentRequest>> {
    let payment = state.payments.decide(&actor, id, body.decision, body.note)?;
    Ok(Json(payment))
}
