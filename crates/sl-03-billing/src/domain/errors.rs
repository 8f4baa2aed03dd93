use super::entities::BillStatus;
use shared_types::{BillId, Classify, ErrorKind};
use sl_02_record_store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BillingError {
    /// Missing, or not visible to the caller.
    #[error("Bill {0} not found")]
    NotFound(BillId),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Bill cannot move from {from} to {to}")]
    InvalidTransition { from: BillStatus, to: BillStatus },

    /// The bill has left `pending` and its owner can no longer edit it.
    #[error("Bill is {0} and can no longer be changed")]
    Locked(BillStatus),

    #[error("Invalid bill: {0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl Classify for BillingError {
    fn kind(&self) -> ErrorKind {
        match self {
            BillingError::NotFound(_) => ErrorKind::NotFound,
            BillingError::Forbidden(_) => ErrorKind::Forbidden,
            BillingError::InvalidTransition { .. } => ErrorKind::Conflict,
            BillingError::Locked(_) => ErrorKind::Conflict,
            BillingError::Invalid(_) => ErrorKind::Invalid,
            BillingError::Storage(e) => e.kind(),
        }
    }
}
