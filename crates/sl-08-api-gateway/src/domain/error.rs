//! API error type and its JSON rendering.
//!
//! Every failure leaves the gateway as
//! `{"error": {"code": "...", "message": "..."}}` with a matching status.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shared_types::{Classify, ErrorKind};
use std::fmt;
use tracing::error;

/// Machine-readable codes that have no `ErrorKind` counterpart.
pub mod codes {
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const TIMEOUT: &str = "timeout";
}

/// An error on its way to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    /// Seconds for the `Retry-After` header.
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Map a subsystem error category onto its HTTP status.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, kind.code(), message)
    }

    pub fn invalid(details: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Invalid, details)
    }

    pub fn unauthorized(details: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Unauthorized, details)
    }

    pub fn not_found(details: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::NotFound, details)
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Storage, details)
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::PAYLOAD_TOO_LARGE,
            format!("Request body exceeds {limit} bytes"),
        )
    }

    pub fn rate_limited(retry_after_ms: u64) -> Self {
        Self {
            retry_after: Some(retry_after_ms.div_ceil(1000).max(1)),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                codes::RATE_LIMITED,
                "Rate limit exceeded",
            )
        }
    }

    pub fn timeout(limit: std::time::Duration) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            codes::TIMEOUT,
            format!("Request exceeded {}s timeout", limit.as_secs()),
        )
    }

    /// Translate a subsystem error. Storage failures are logged here and
    /// reach the client without their details.
    pub fn from_domain<E: Classify + fmt::Display>(err: E) -> Self {
        match err.kind() {
            ErrorKind::Storage => {
                error!(error = %err, "Storage failure while serving request");
                Self::internal("Internal storage error")
            }
            kind => Self::from_kind(kind, err.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: &self.message,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

macro_rules! from_domain_errors {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ApiError {
                fn from(err: $ty) -> Self {
                    ApiError::from_domain(err)
                }
            }
        )*
    };
}

from_domain_errors!(
    sl_01_identity::IdentityError,
    sl_02_record_store::StoreError,
    sl_03_billing::BillingError,
    sl_04_payments::PaymentError,
    sl_05_document_forwarding::DfsError,
    sl_06_agreements::AgreementError,
    sl_07_notifications::NotificationError,
);

// Extractor rejections keep their status but use the JSON body.

fn rejection(status: StatusCode, text: String) -> ApiError {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::new(status, codes::PAYLOAD_TOO_LARGE, text),
        StatusCode::UNSUPPORTED_MEDIA_TYPE | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::invalid(text)
        }
        s if s.is_server_error() => ApiError::internal(text),
        _ => ApiError::invalid(text),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        rejection(r.status(), r.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self {
        rejection(r.status(), r.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self {
        rejection(r.status(), r.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(r: MultipartRejection) -> Self {
        rejection(r.status(), r.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        rejection(e.status(), e.body_text())
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors (server start-up, not request handling)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// The server loop failed
    #[error("server error: {0}")]
    Serve(String),
}
