//! # Billing (sl-03)
//!
//! Client-submitted bills for completed work and their review lifecycle.
//!
//! ```text
//! pending ──approve──→ approved ──mark_paid──→ paid
//!    │
//!    └─────reject────→ rejected
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Tenant Isolation | Clients see and change only their own bills |
//! | 2 | Positive Amount | A bill is never submitted or edited to zero |
//! | 3 | Frozen After Review | Only pending bills can be edited, attached to or withdrawn by the client |
//! | 4 | Legal Transitions | Status moves only along the diagram above |
//! | 5 | Unique Numbers | `BILL-nnnnnn` numbers come from a persisted sequence |

pub mod domain;
pub mod service;

pub use domain::entities::{Bill, BillFilter, BillStatus, BillSummary, BillUpdate, NewBill};
pub use domain::errors::BillingError;
pub use service::BillingService;
