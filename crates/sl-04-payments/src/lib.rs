//! # Payment Requests (sl-04)
//!
//! Clients ask for a reimbursement or an advance; staff decide once.
//!
//! ```text
//! pending ──approve──→ approved
//!    │
//!    └─────reject────→ rejected
//! ```
//!
//! A pending request may also be cancelled by its owner, which removes it.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Tenant Isolation | Clients see only their own requests |
//! | 2 | Positive Amount | Requests are for more than zero |
//! | 3 | Single Decision | A request is decided at most once |

pub mod domain;
pub mod service;

pub use domain::entities::{
    NewPaymentRequest, PaymentFilter, PaymentKind, PaymentRequest, PaymentStatus, PaymentSummary,
};
pub use domain::errors::PaymentError;
pub use service::PaymentService;
