//! # Event Publisher
//!
//! The publishing half of the bus plus two test doubles.

use crate::events::{EventFilter, EventTopic, PortalEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Live subscriptions per topic. Subscribers without a topic filter are
/// counted under [`EventTopic::All`].
pub(crate) type Interest = Arc<RwLock<HashMap<EventTopic, usize>>>;

/// Anything services can publish domain events to.
///
/// Services hold an `Arc<dyn EventPublisher>` and publish only after the
/// state change is persisted. Publishing never blocks.
pub trait EventPublisher: Send + Sync {
    /// Returns how many subscribers will see the event.
    fn publish(&self, event: PortalEvent) -> usize;

    /// Events offered to the bus so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// Broadcast-channel bus shared by every service in the process.
///
/// Every subscriber gets its own receiver; filtering happens on the
/// receiving side. The bus keeps a per-topic interest count so an event
/// nobody listens for is counted but never cloned into the channel.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<PortalEvent>,
    interest: Interest,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// A bus whose slowest subscriber may fall `capacity` events behind
    /// before it starts losing the oldest ones.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            interest: Arc::default(),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let topics = interest_topics(&filter);
        {
            let mut interest = self.interest.write();
            for topic in &topics {
                *interest.entry(*topic).or_insert(0) += 1;
            }
        }
        debug!(topics = ?topics, "Subscription opened");
        Subscription::new(receiver, filter, topics, Arc::clone(&self.interest))
    }

    /// Subscribers whose filter accepts events on `topic`.
    #[must_use]
    pub fn interested(&self, topic: EventTopic) -> usize {
        let interest = self.interest.read();
        let wildcard = interest.get(&EventTopic::All).copied().unwrap_or(0);
        if topic == EventTopic::All {
            return interest.values().sum();
        }
        wildcard + interest.get(&topic).copied().unwrap_or(0)
    }

    /// Open receivers, filtered or not.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: PortalEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let topic = event.topic();
        let interested = self.interested(topic);
        if interested == 0 {
            trace!(topic = ?topic, event = event.name(), "No subscriber for event");
            return 0;
        }

        let name = event.name();
        match self.sender.send(event) {
            Ok(_) => {
                debug!(topic = ?topic, event = name, receivers = interested, "Event published");
                interested
            }
            Err(_) => {
                warn!(topic = ?topic, event = name, "Event dropped: every receiver closed");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

/// The topics a filter registers interest in, without duplicates.
fn interest_topics(filter: &EventFilter) -> Vec<EventTopic> {
    if filter.topics.is_empty() || filter.topics.contains(&EventTopic::All) {
        return vec![EventTopic::All];
    }
    let mut topics = filter.topics.clone();
    topics.sort_by_key(|t| *t as u8);
    topics.dedup();
    topics
}

/// Counts and discards. For services under unit test that do not care
/// about their events.
#[derive(Debug, Default)]
pub struct NoopPublisher {
    published: AtomicU64,
}

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: PortalEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        0
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

/// Keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: RwLock<Vec<PortalEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PortalEvent> {
        self.events.read().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: PortalEvent) -> usize {
        self.events.write().push(event);
        1
    }

    fn events_published(&self) -> u64 {
        self.events.read().len() as u64
    }
}
