//! Port traits implemented by storage adapters.

pub mod outbound;
