//! # Event Wiring
//!
//! Starts the bus subscribers and stops them on the shutdown signal.
//!
//! ```text
//! Billing / Payments / DFS / Agreements ──PortalEvent──→ Event Bus
//!                                                           │
//!                          ┌────────────────────────────────┤
//!                          ↓                                ↓
//!                 NotificationRouter               EventMetricsHandler
//!                 (inbox entries)                  (Prometheus counters)
//! ```

use crate::container::PortalContainer;
use crate::handlers::EventMetricsHandler;
use sl_07_notifications::NotificationRouter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Spawn every runtime subscriber. Each task ends when `shutdown` flips to
/// `true` or the bus closes. The notification router first delivers what is
/// already queued.
pub fn spawn_event_handlers(
    container: &PortalContainer,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::with_capacity(2);

    // Notification router
    let router = NotificationRouter::new(
        container.bus.subscribe(NotificationRouter::filter()),
        container.notifications.clone(),
        container.directory(),
    );
    tasks.push(tokio::spawn(router.run_until(shutdown.clone())));

    // Event metrics
    let metrics = EventMetricsHandler::new(container.bus.subscribe(EventMetricsHandler::filter()));
    let mut metrics_shutdown = shutdown.clone();
    tasks.push(tokio::spawn(async move {
        tokio::select! {
            _ = metrics.run() => {}
            _ = metrics_shutdown.changed() => {
                info!("[metrics] Shutdown signal received");
            }
        }
    }));

    info!(handlers = tasks.len(), "Event handlers started");
    tasks
}
