//! # Event Handlers
//!
//! Bus subscribers owned by the runtime. Notification delivery lives in
//! `sl-07-notifications`; this module holds the handlers with no domain home.

pub mod event_metrics;

pub use event_metrics::EventMetricsHandler;
