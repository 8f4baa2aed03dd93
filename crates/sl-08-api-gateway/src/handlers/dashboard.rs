//! Role-scoped dashboard.

use crate::domain::error::ApiResult;
use crate::extract::CurrentUser;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use shared_types::{Cid, Role};
use sl_01_identity::UserCounts;
use sl_03_billing::BillSummary;
use sl_04_payments::PaymentSummary;
use sl_05_document_forwarding::DocumentSummary;
use sl_06_agreements::AgreementSummary;

/// Totals a caller is allowed to see.
///
/// Reviewers get portal-wide figures and user counts; clients get the same
/// summaries restricted to their own records.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<Cid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<UserCounts>,
    pub bills: BillSummary,
    pub payments: PaymentSummary,
    pub documents: DocumentSummary,
    pub agreements: AgreementSummary,
    /// Documents awaiting the caller (reviewers only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbox: Option<usize>,
    pub unread_notifications: usize,
}

/// `GET /api/dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> ApiResult<Json<Dashboard>> {
    let scope = actor.scope();
    let (users, inbox) = if actor.is_reviewer() {
        (
            Some(state.identity.counts()?),
            Some(state.documents.inbox_size(&actor.user_id)?),
        )
    } else {
        (None, None)
    };

    Ok(Json(Dashboard {
        role: actor.role,
        cid: actor.cid.clone(),
        users,
        bills: state.billing.summary(scope)?,
        payments: state.payments.summary(scope)?,
        documents: state.documents.summary(scope)?,
        agreements: state.agreements.summary(scope)?,
        inbox,
        unread_notifications: state.notifications.unread_count(&actor)?,
    }))
}
