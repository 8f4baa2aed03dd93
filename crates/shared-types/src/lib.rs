//! # Shared Types Crate
//!
//! This crate contains the identifiers, roles, money type and the `Actor`
//! principal shared by every portal subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Actor Authority**: The `Actor` resolved by the gateway from a verified
//!   token is the sole answer to "who is asking". Request payloads MUST NOT
//!   carry a requester id of their own.
//! - **Tenant Scoping**: Client-visible records carry the client's `Cid` and
//!   `UserId`; `Scope` expresses which slice of the data a caller may see.

pub mod directory;
pub mod entities;
pub mod errors;
pub mod paging;
pub mod time;

pub use directory::{Directory, Member, StaticDirectory};
pub use entities::*;
pub use errors::{Classify, ErrorKind};
pub use paging::{Page, PageRequest};
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource, Timestamp};
