//! # Identity (sl-01)
//!
//! Portal accounts and sessions.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Unique Email | Emails are stored lowercased and are unique |
//! | 2 | Client Ids | Every client holds a `Cid`; staff and admins get none at creation |
//! | 3 | Hashed Passwords | Only argon2 PHC strings are stored |
//! | 4 | Uniform Login Failure | Unknown email and wrong password are indistinguishable |
//! | 5 | Live Sessions | A token is honoured only while its user exists and is active |
//! | 6 | Admin Continuity | An admin cannot delete, demote or deactivate themself |
//!
//! The service also implements the shared `Directory` port so other
//! subsystems can resolve members without depending on this crate.

pub mod domain;
pub mod service;

pub use domain::entities::{NewUser, Session, User, UserCounts, UserUpdate, UserView};
pub use domain::errors::IdentityError;
pub use domain::password::MIN_PASSWORD_LEN;
pub use domain::token::{Claims, IdentityConfig, TokenIssuer, DEFAULT_TOKEN_TTL};
pub use service::IdentityService;
