//! # Event Subscriber
//!
//! The receiving half of the bus.

use crate::events::{EventFilter, EventTopic, PortalEvent};
use crate::publisher::Interest;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// One subscriber's view of the bus.
///
/// Events outside the filter are skipped on receipt. Dropping the handle
/// withdraws its topic interest from the bus.
pub struct Subscription {
    receiver: broadcast::Receiver<PortalEvent>,
    filter: EventFilter,
    topics: Vec<EventTopic>,
    interest: Interest,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<PortalEvent>,
        filter: EventFilter,
        topics: Vec<EventTopic>,
        interest: Interest,
    ) -> Self {
        Self {
            receiver,
            filter,
            topics,
            interest,
        }
    }

    /// Next matching event, or `None` once the bus is gone. A subscriber
    /// that fell behind skips what it missed and carries on.
    pub async fn recv(&mut self) -> Option<PortalEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => lagged(missed),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking [`recv`](Self::recv): `Ok(None)` when nothing matching
    /// is queued.
    pub fn try_recv(&mut self) -> Result<Option<PortalEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(missed)) => lagged(missed),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

fn lagged(missed: u64) {
    warn!(missed, "Subscriber lagged; oldest events were dropped");
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut interest = self.interest.write();
        for topic in &self.topics {
            if let Some(count) = interest.get_mut(topic) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    interest.remove(topic);
                }
            }
        }
        debug!(topics = ?self.topics, "Subscription closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::InMemoryEventBus;
    use crate::EventPublisher;
    use shared_types::{Amount, BillId, DocumentId, UserId};
    use std::time::Duration;
    use tokio::time::timeout;

    fn uploaded() -> PortalEvent {
        PortalEvent::DocumentUploaded {
            actor: UserId::new(),
            document_id: DocumentId::new(),
            title: "Estimate".into(),
        }
    }

    fn bill_paid() -> PortalEvent {
        PortalEvent::BillPaid {
            actor: UserId::new(),
            bill_id: BillId::new(),
            bill_number: "BILL-000007".into(),
            client_id: UserId::new(),
            amount: Amount(500),
        }
    }

    #[tokio::test]
    async fn test_subscription_recv() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        bus.publish(uploaded());

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");

        assert!(matches!(received, PortalEvent::DocumentUploaded { .. }));
    }

    #[tokio::test]
    async fn test_subscription_filter() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Billing]));

        // Filtered out
        bus.publish(uploaded());
        bus.publish(bill_paid());

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");

        assert!(matches!(received, PortalEvent::BillPaid { .. }));
    }

    #[tokio::test]
    async fn test_subscription_drop_withdraws_interest() {
        let bus = InMemoryEventBus::new();

        {
            let _sub1 = bus.subscribe(EventFilter::all());
            let _sub2 = bus.subscribe(EventFilter::topics(vec![EventTopic::Billing]));
            assert_eq!(bus.subscriber_count(), 2);
            assert_eq!(bus.interested(EventTopic::Billing), 2);
        }

        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.interested(EventTopic::Billing), 0);
        assert_eq!(bus.publish(bill_paid()), 0);
    }

    #[test]
    fn test_try_recv_empty_then_event() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        assert!(matches!(sub.try_recv(), Ok(None)));

        bus.publish(bill_paid());
        assert!(matches!(sub.try_recv(), Ok(Some(PortalEvent::BillPaid { .. }))));
    }

    #[test]
    fn test_try_recv_closed() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        drop(bus);
        assert_eq!(sub.try_recv(), Err(SubscriptionError::Closed));
    }

    #[test]
    fn test_lagged_subscriber_skips_ahead() {
        let bus = InMemoryEventBus::with_capacity(2);
        let mut sub = bus.subscribe(EventFilter::all());
        for _ in 0..5 {
            bus.publish(bill_paid());
        }
        // Oldest events were overwritten; the newest still arrive.
        assert!(matches!(sub.try_recv(), Ok(Some(_))));
        assert!(matches!(sub.try_recv(), Ok(Some(_))));
        assert!(matches!(sub.try_recv(), Ok(None)));
    }
}
