use super::entities::AgreementStatus;
use shared_types::{AgreementId, Classify, ErrorKind, UserId};
use sl_02_record_store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgreementError {
    #[error("Agreement {0} not found")]
    NotFound(AgreementId),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Agreement cannot move from {from} to {to}")]
    InvalidTransition {
        from: AgreementStatus,
        to: AgreementStatus,
    },

    /// The addressee is missing, disabled or not a client.
    #[error("User {0} is not an active client")]
    NotAClient(UserId),

    #[error("Invalid agreement: {0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl Classify for AgreementError {
    fn kind(&self) -> ErrorKind {
        match self {
            AgreementError::NotFound(_) => ErrorKind::NotFound,
            AgreementError::Forbidden(_) => ErrorKind::Forbidden,
            AgreementError::InvalidTransition { .. } => ErrorKind::Conflict,
            AgreementError::NotAClient(_) | AgreementError::Invalid(_) => ErrorKind::Invalid,
            AgreementError::Storage(e) => e.kind(),
        }
    }
}
