//! Counts domain events into the Prometheus registry.

use shared_bus::{EventFilter, Subscription};
use tracing::{debug, info};

/// Feeds every published event to `portal_telemetry::record_event`.
pub struct EventMetricsHandler {
    subscription: Subscription,
}

impl EventMetricsHandler {
    /// Topics this handler needs.
    pub fn filter() -> EventFilter {
        EventFilter::all()
    }

    pub fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// Run until the bus closes. Returns how many events were counted.
    pub async fn run(mut self) -> u64 {
        info!("Event metrics handler started");
        let mut counted = 0;
        while let Some(event) = self.subscription.recv().await {
            debug!(event = event.name(), "Recording event");
            portal_telemetry::record_event(event.name());
            counted += 1;
        }
        info!(counted, "Event metrics handler stopped: event bus closed");
        counted
    }
}
