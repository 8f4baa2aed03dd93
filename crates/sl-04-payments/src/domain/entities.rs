use serde::{Deserialize, Serialize};
use shared_types::{Amount, Cid, PaymentId, Timestamp, Totals, UserId};
use sl_02_record_store::{IndexEntry, Record};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Money already spent by the client on the company's behalf.
    Reimbursement,
    /// Money requested ahead of the work.
    Advance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub id: PaymentId,
    pub client_id: UserId,
    pub cid: Option<Cid>,
    pub kind: PaymentKind,
    pub amount: Amount,
    pub purpose: String,
    pub status: PaymentStatus,
    pub decision_note: Option<String>,
    pub decided_by: Option<UserId>,
    pub decided_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Record for PaymentRequest {
    const COLLECTION: &'static str = "payments";

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn indexes(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::new("client", self.client_id.to_string()),
            IndexEntry::new("status", self.status.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPaymentRequest {
    pub kind: PaymentKind,
    pub amount: Amount,
    pub purpose: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub kind: Option<PaymentKind>,
    pub cid: Option<Cid>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &PaymentRequest) -> bool {
        self.status.map_or(true, |s| payment.status == s)
            && self.kind.map_or(true, |k| payment.kind == k)
            && self
                .cid
                .as_ref()
                .map_or(true, |c| payment.cid.as_ref() == Some(c))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub total: Totals,
    pub pending: Totals,
    pub approved: Totals,
    pub rejected: Totals,
}

impl PaymentSummary {
    pub fn add(&mut self, payment: &PaymentRequest) {
        self.total.add(payment.amount);
        match payment.status {
            PaymentStatus::Pending => self.pending.add(payment.amount),
            PaymentStatus::Approved => self.approved.add(payment.amount),
            PaymentStatus::Rejected => self.rejected.add(payment.amount),
        }
    }
}
