use super::entities::PaymentStatus;
use shared_types::{Classify, ErrorKind, PaymentId};
use sl_02_record_store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Payment request {0} not found")]
    NotFound(PaymentId),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    /// Already decided.
    #[error("Payment request is already {0}")]
    AlreadyDecided(PaymentStatus),

    #[error("Invalid payment request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl Classify for PaymentError {
    fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::NotFound(_) => ErrorKind::NotFound,
            PaymentError::Forbidden(_) => ErrorKind::Forbidden,
            PaymentError::AlreadyDecided(_) => ErrorKind::Conflict,
            PaymentError::Invalid(_) => ErrorKind::Invalid,
            PaymentError::Storage(e) => e.kind(),
        }
    }
}
