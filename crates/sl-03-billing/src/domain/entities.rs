use super::errors::BillingError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared_types::{Amount, BillId, Cid, FileRef, Timestamp, Totals, UserId};
use sl_02_record_store::{IndexEntry, Record};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl BillStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BillStatus::Pending => "pending",
            BillStatus::Approved => "approved",
            BillStatus::Rejected => "rejected",
            BillStatus::Paid => "paid",
        }
    }

    pub fn can_transition_to(self, next: BillStatus) -> bool {
        matches!(
            (self, next),
            (BillStatus::Pending, BillStatus::Approved)
                | (BillStatus::Pending, BillStatus::Rejected)
                | (BillStatus::Approved, BillStatus::Paid)
        )
    }

    pub fn transition(self, next: BillStatus) -> Result<BillStatus, BillingError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BillingError::InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    /// `BILL-000001`, assigned at submission.
    pub bill_number: String,
    pub client_id: UserId,
    pub cid: Option<Cid>,
    pub title: String,
    pub work_description: String,
    pub site: Option<String>,
    pub amount: Amount,
    pub bill_date: NaiveDate,
    pub status: BillStatus,
    /// Reviewer remark, set on approve or reject.
    pub remarks: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<Timestamp>,
    pub paid_at: Option<Timestamp>,
    pub attachment: Option<FileRef>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Record for Bill {
    const COLLECTION: &'static str = "bills";

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn indexes(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::new("client", self.client_id.to_string()),
            IndexEntry::new("status", self.status.as_str()),
            IndexEntry::unique("number", &self.bill_number),
        ]
    }
}

pub fn bill_number(n: u64) -> String {
    format!("BILL-{n:06}")
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBill {
    pub title: String,
    pub work_description: String,
    #[serde(default)]
    pub site: Option<String>,
    pub amount: Amount,
    /// Defaults to the submission date.
    #[serde(default)]
    pub bill_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BillUpdate {
    pub title: Option<String>,
    pub work_description: Option<String>,
    pub site: Option<String>,
    pub amount: Option<Amount>,
    pub bill_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BillFilter {
    pub status: Option<BillStatus>,
    pub cid: Option<Cid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BillSummary {
    pub total: Totals,
    pub pending: Totals,
    pub approved: Totals,
    pub rejected: Totals,
    pub paid: Totals,
}

impl BillSummary {
    pub fn add(&mut self, bill: &Bill) {
        self.total.add(bill.amount);
        match bill.status {
            BillStatus::Pending => self.pending.add(bill.amount),
            BillStatus::Approved => self.approved.add(bill.amount),
            BillStatus::Rejected => self.rejected.add(bill.amount),
            BillStatus::Paid => self.paid.add(bill.amount),
        }
    }
}
