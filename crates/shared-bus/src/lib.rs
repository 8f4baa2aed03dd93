//! # Shared Bus - Event Bus for Inter-Subsystem Communication
//!
//! Domain services publish a `PortalEvent` after every persisted state
//! change; side effects such as inbox notifications subscribe to the bus
//! instead of being called directly.
//!
//! ## Choreography Pattern
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────────┐
//! │ Billing, DFS │                    │ Notification     │
//! │ Agreements.. │    publish()       │ Router           │
//! │              │ ──────┐            │                  │
//! └──────────────┘       │            └──────────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Every event names the `actor` that caused it; the `Actor` resolved by
//! the gateway is the sole authority for that field.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, PortalEvent};
pub use publisher::{EventPublisher, InMemoryEventBus, NoopPublisher, RecordingPublisher};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the slowest one lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

