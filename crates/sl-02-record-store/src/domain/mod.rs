//! Pure domain pieces of the record store.

pub mod envelope;
pub mod errors;
pub mod keys;
