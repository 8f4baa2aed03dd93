//! # SiteLedger Test Suite
//!
//! End-to-end flows driven through the HTTP router with in-memory storage.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── mod.rs              # TestPortal harness
//!     ├── auth_flows.rs       # login, cookies, accounts, CIDs
//!     ├── billing_flows.rs    # bills and payment requests
//!     ├── dfs_flows.rs        # document custody chain
//!     ├── agreement_flows.rs  # issue, view, sign, reject
//!     └── portal_flows.rs     # notifications, dashboard, health, metrics
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sl-tests
//! cargo test -p sl-tests integration::dfs_flows
//! ```

pub mod integration;
