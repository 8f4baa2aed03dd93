//! # Error Types
//!
//! Each subsystem owns its error enum. `ErrorKind` is the coarse
//! classification the gateway maps onto HTTP status codes.

use serde::Serialize;

/// Coarse error category shared across subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The referenced record does not exist (or is invisible to the caller).
    NotFound,
    /// The caller is authenticated but not allowed to do this.
    Forbidden,
    /// The caller could not be authenticated.
    Unauthorized,
    /// The request conflicts with current state (duplicate, bad transition).
    Conflict,
    /// The request itself is malformed or violates a validation rule.
    Invalid,
    /// Persistence failed or stored data is corrupt.
    Storage,
}

impl ErrorKind {
    /// Stable machine-readable code used in API error bodies.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Storage => "storage",
        }
    }
}

/// Implemented by every subsystem error.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}
