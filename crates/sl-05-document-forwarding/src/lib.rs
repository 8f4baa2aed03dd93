//! # Document Forwarding System (sl-05)
//!
//! Uploaded documents travel between staff members and admins; each hop is
//! appended to a trail that forms the document's custody chain.
//!
//! ```text
//! pending ──forward──→ in_review ──decide──→ approved | rejected
//!    │                                           ↑
//!    └──────────────────decide──────────────────┘
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Custody | Only the current owner (or an admin) forwards or decides |
//! | 2 | Valid Recipient | Recipients exist, are active, are staff or admin, and are not the owner |
//! | 3 | Review On Forward | Forwarding a pending document puts it in review |
//! | 4 | Terminal States | Approved and rejected documents never change again |
//! | 5 | Append-Only Trail | `seq` is contiguous from 0, entry 0 is the upload, and the chain ends at `current_owner` |
//! | 6 | Need To Know | Only parties to the trail and admins can see a document |
//! | 7 | Verified Download | Served bytes must match the digest taken at upload |
//! | 8 | Deletion | Uploaders delete until first forwarded; admins always |

pub mod domain;
pub mod service;

pub use domain::entities::{
    Document, DocumentStatus, DocumentSummary, NewDocument, TrailAction, TrailEntry,
};
pub use domain::errors::DfsError;
pub use domain::trail::{verify as verify_trail, TrailViolation};
pub use service::DocumentService;
