//! # Agreements (sl-06)
//!
//! Contracts issued by staff to a single client, who views and then signs
//! or rejects them.
//!
//! ```text
//! sent ──open──→ viewed ──sign──→ signed
//!  │  │            │  └──reject─→ rejected
//!  │  └──sign / reject (unopened)
//!  └──withdraw (issuer or admin, before a decision)──→ withdrawn
//! ```

pub mod domain;
pub mod service;

pub use domain::entities::{
    Agreement, AgreementFilter, AgreementStatus, AgreementSummary, NewAgreement, Signature,
};
pub use domain::errors::AgreementError;
pub use service::AgreementService;
