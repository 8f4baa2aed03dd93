use super::entities::DocumentStatus;
use super::trail::TrailViolation;
use shared_types::{Classify, DocumentId, ErrorKind, UserId};
use sl_02_record_store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DfsError {
    /// Missing, or the caller has no part in it.
    #[error("Document {0} not found")]
    NotFound(DocumentId),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Document cannot move from {from} to {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    /// Approved and rejected documents are closed.
    #[error("Document is {0} and closed to further changes")]
    Closed(DocumentStatus),

    #[error("Cannot forward to {user}: {reason}")]
    InvalidRecipient { user: UserId, reason: &'static str },

    #[error("Invalid document: {0}")]
    Invalid(String),

    #[error("Custody trail rejected: {0}")]
    Trail(#[from] TrailViolation),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl Classify for DfsError {
    fn kind(&self) -> ErrorKind {
        match self {
            DfsError::NotFound(_) => ErrorKind::NotFound,
            DfsError::Forbidden(_) => ErrorKind::Forbidden,
            DfsError::InvalidTransition { .. } | DfsError::Closed(_) => ErrorKind::Conflict,
            DfsError::InvalidRecipient { .. } | DfsError::Invalid(_) => ErrorKind::Invalid,
            DfsError::Trail(_) => ErrorKind::Storage,
            DfsError::Storage(e) => e.kind(),
        }
    }
}
