use shared_types::{Classify, ErrorKind, UserId};
use sl_02_record_store::StoreError;
use thiserror::Error;

/// Identity errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Unknown email or wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    /// Malformed, forged or revoked token.
    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session expired")]
    TokenExpired,

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("User {0} not found")]
    NotFound(UserId),

    #[error("Email {0} is already registered")]
    EmailTaken(String),

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl Classify for IdentityError {
    fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::InvalidCredentials
            | IdentityError::InvalidToken
            | IdentityError::TokenExpired => ErrorKind::Unauthorized,
            IdentityError::AccountDisabled | IdentityError::Forbidden(_) => ErrorKind::Forbidden,
            IdentityError::NotFound(_) => ErrorKind::NotFound,
            IdentityError::EmailTaken(_) => ErrorKind::Conflict,
            IdentityError::WeakPassword(_) | IdentityError::Invalid(_) => ErrorKind::Invalid,
            IdentityError::Hashing(_) => ErrorKind::Storage,
            IdentityError::Storage(e) => e.kind(),
        }
    }
}
