use shared_types::{Classify, ErrorKind, NotificationId};
use sl_02_record_store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Notification {0} not found")]
    NotFound(NotificationId),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Invalid notification: {0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl Classify for NotificationError {
    fn kind(&self) -> ErrorKind {
        match self {
            NotificationError::NotFound(_) => ErrorKind::NotFound,
            NotificationError::Forbidden(_) => ErrorKind::Forbidden,
            NotificationError::Invalid(_) => ErrorKind::Invalid,
            NotificationError::Storage(e) => e.kind(),
        }
    }
}
