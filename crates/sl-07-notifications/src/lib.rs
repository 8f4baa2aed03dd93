//! # Notifications (sl-07)
//!
//! Per-user inboxes, plus a router that listens on the event bus and drops
//! a notification into the inbox of whoever an event concerns.
//!
//! ## Routing
//!
//! | Event | Recipients |
//! |-------|------------|
//! | `BillSubmitted`, `PaymentRequested` | every active admin and staff member |
//! | `BillReviewed`, `BillPaid`, `PaymentDecided` | the client |
//! | `DocumentForwarded` | the new holder |
//! | `DocumentStatusChanged` | the uploader |
//! | `AgreementIssued` | the client |
//! | `AgreementSigned`, `AgreementRejected` | the issuer |
//!
//! The user who caused an event is never notified about it.

pub mod domain;
pub mod router;
pub mod service;

pub use domain::entities::{Notification, NotificationKind};
pub use domain::errors::NotificationError;
pub use router::NotificationRouter;
pub use service::NotificationService;
