//! # SL-08 API Gateway
//!
//! REST front end for the SiteLedger portal.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     API GATEWAY (sl-08)                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  CORS → Tracing → Timeout → RateLimit → BodyLimit            │
//! │                          │                                    │
//! │  CurrentUser extractor (cookie / Bearer → Actor)              │
//! │                          │                                    │
//! │  /api/auth  /api/users  /api/bills  /api/payments             │
//! │  /api/dfs   /api/agreements  /api/notifications               │
//! │  /api/dashboard   /health   /metrics                          │
//! │                          │                                    │
//! │  Identity · Billing · Payments · DFS · Agreements · Inbox     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Every `/api` route except login/logout needs a session | `CurrentUser` extractor |
//! | Role checks happen in the services, never in handlers | handlers pass `&Actor` through |
//! | Records outside the caller's scope look missing | services return `NotFound`, mapped to 404 |
//! | Error bodies are `{"error":{"code","message"}}` | `ApiError: IntoResponse` |
//! | Storage failures never leak details | 500 with a generic message, details logged |
//! | JSON bodies ≤ `max_request_size`, uploads ≤ `max_upload_size` | `BodyLimitLayer`, `DefaultBodyLimit` |

pub mod domain;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod state;

pub use domain::config::{
    AuthConfig, CorsConfig, GatewayConfig, HttpConfig, LimitsConfig, RateLimitConfig,
    TimeoutConfig,
};
pub use domain::error::{ApiError, ApiResult, GatewayError};
pub use router::build_router;
pub use service::ApiGatewayService;
pub use state::AppState;
