//! # Notification Router
//!
//! Bus subscriber that turns domain events into inbox entries.

use crate::domain::entities::NotificationKind;
use crate::service::NotificationService;
use shared_bus::{EventFilter, EventTopic, PortalEvent, Subscription};
use shared_types::{Directory, Role, UserId};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What to write for one event.
struct Outgoing {
    recipients: Vec<UserId>,
    kind: NotificationKind,
    title: String,
    message: String,
    link: String,
}

pub struct NotificationRouter {
    subscription: Subscription,
    notifications: Arc<NotificationService>,
    directory: Arc<dyn Directory>,
}

impl NotificationRouter {
    /// Topics the router needs; pass to `InMemoryEventBus::subscribe`.
    pub fn filter() -> EventFilter {
        EventFilter::topics(vec![
            EventTopic::Billing,
            EventTopic::Payments,
            EventTopic::Documents,
            EventTopic::Agreements,
        ])
    }

    pub fn new(
        subscription: Subscription,
        notifications: Arc<NotificationService>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            subscription,
            notifications,
            directory,
        }
    }

    /// Run until the bus closes.
    pub async fn run(mut self) {
        info!("Notification router started");
        while let Some(event) = self.subscription.recv().await {
            self.route(&event);
        }
        info!("Notification router stopped: event bus closed");
    }

    /// Run until the bus closes or `shutdown` fires. On shutdown the events
    /// already queued for the router are still delivered.
    pub async fn run_until(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Notification router started");
        loop {
            tokio::select! {
                event = self.subscription.recv() => match event {
                    Some(event) => {
                        self.route(&event);
                    }
                    None => {
                        info!("Notification router stopped: event bus closed");
                        return;
                    }
                },
                _ = shutdown.changed() => {
                    let drained = self.drain();
                    info!(drained, "Notification router stopped: shutdown");
                    return;
                }
            }
        }
    }

    /// Route every event already queued without waiting for more. Returns
    /// how many events were handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(Some(event)) = self.subscription.try_recv() {
            self.route(&event);
            handled += 1;
        }
        handled
    }

    /// Deliver the notifications for one event. A failed delivery is logged
    /// and the remaining recipients are still notified. Returns how many
    /// were written.
    pub fn route(&self, event: &PortalEvent) -> usize {
        let Some(out) = self.outgoing(event) else {
            return 0;
        };
        let actor = event.actor();
        let mut delivered = 0;
        for recipient in out.recipients.into_iter().filter(|r| *r != actor) {
            match self.notifications.notify(
                recipient,
                out.kind,
                out.title.clone(),
                out.message.clone(),
                Some(out.link.clone()),
            ) {
                Ok(_) => delivered += 1,
                Err(e) => warn!(
                    event = event.name(),
                    recipient = %recipient,
                    error = %e,
                    "Failed to deliver notification"
                ),
            }
        }
        debug!(event = event.name(), delivered, "Event routed");
        delivered
    }

    /// Every active admin and staff member, for items awaiting review.
    fn reviewers(&self) -> Vec<UserId> {
        [Role::Admin, Role::Staff]
            .into_iter()
            .flat_map(|role| self.directory.members_with_role(role))
            .filter(|m| m.active)
            .map(|m| m.id)
            .collect()
    }

    fn outgoing(&self, event: &PortalEvent) -> Option<Outgoing> {
        let verdict = |approved: bool| if approved { "approved" } else { "rejected" };
        let out = match event {
            PortalEvent::BillSubmitted {
                bill_id,
                bill_number,
                amount,
                ..
            } => Outgoing {
                recipients: self.reviewers(),
                kind: NotificationKind::Bill,
                title: "New bill submitted".into(),
                message: format!("{bill_number} for {amount} is waiting for review"),
                link: format!("/bills/{bill_id}"),
            },
            PortalEvent::BillReviewed {
                bill_id,
                bill_number,
                client_id,
                approved,
                ..
            } => Outgoing {
                recipients: vec![*client_id],
                kind: NotificationKind::Bill,
                title: format!("Bill {}", verdict(*approved)),
                message: format!("{bill_number} was {}", verdict(*approved)),
                link: format!("/bills/{bill_id}"),
            },
            PortalEvent::BillPaid {
                bill_id,
                bill_number,
                client_id,
                amount,
                ..
            } => Outgoing {
                recipients: vec![*client_id],
                kind: NotificationKind::Bill,
                title: "Bill paid".into(),
                message: format!("{bill_number} was paid ({amount})"),
                link: format!("/bills/{bill_id}"),
            },
            PortalEvent::PaymentRequested {
                payment_id, amount, ..
            } => Outgoing {
                recipients: self.reviewers(),
                kind: NotificationKind::Payment,
                title: "New payment request".into(),
                message: format!("A payment of {amount} was requested"),
                link: format!("/payments/{payment_id}"),
            },
            PortalEvent::PaymentDecided {
                payment_id,
                client_id,
                approved,
                ..
            } => Outgoing {
                recipients: vec![*client_id],
                kind: NotificationKind::Payment,
                title: format!("Payment request {}", verdict(*approved)),
                message: format!("Your payment request was {}", verdict(*approved)),
                link: format!("/payments/{payment_id}"),
            },
            PortalEvent::DocumentForwarded {
                document_id,
                title,
                to,
                ..
            } => Outgoing {
                recipients: vec![*to],
                kind: NotificationKind::Document,
                title: "Document forwarded to you".into(),
                message: format!("\"{title}\" is now in your inbox"),
                link: format!("/dfs/{document_id}"),
            },
            PortalEvent::DocumentStatusChanged {
                document_id,
                title,
                uploaded_by,
                status,
                ..
            } => Outgoing {
                recipients: vec![*uploaded_by],
                kind: NotificationKind::Document,
                title: "Document status changed".into(),
                message: format!("\"{title}\" is now {status}"),
                link: format!("/dfs/{document_id}"),
            },
            PortalEvent::AgreementIssued {
                agreement_id,
                title,
                client_id,
                ..
            } => Outgoing {
                recipients: vec![*client_id],
                kind: NotificationKind::Agreement,
                title: "New agreement".into(),
                message: format!("\"{title}\" is waiting for your signature"),
                link: format!("/agreements/{agreement_id}"),
            },
            PortalEvent::AgreementSigned {
                agreement_id,
                title,
                issued_by,
                ..
            } => Outgoing {
                recipients: vec![*issued_by],
                kind: NotificationKind::Agreement,
                title: "Agreement signed".into(),
                message: format!("\"{title}\" was signed"),
                link: format!("/agreements/{agreement_id}"),
            },
            PortalEvent::AgreementRejected {
                agreement_id,
                title,
                issued_by,
                reason,
                ..
            } => Outgoing {
                recipients: vec![*issued_by],
                kind: NotificationKind::Agreement,
                title: "Agreement rejected".into(),
                message: format!("\"{title}\" was rejected: {reason}"),
                link: format!("/agreements/{agreement_id}"),
            },
            PortalEvent::UserCreated { .. }
            | PortalEvent::DocumentUploaded { .. }
            | PortalEvent::AgreementViewed { .. } => return None,
        };
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shared_bus::{EventPublisher, InMemoryEventBus};
    use shared_types::{
        Actor, Amount, BillId, DocumentId, FixedTimeSource, Member, PageRequest, PaymentId,
        StaticDirectory,
    };
    use sl_02_record_store::{
        BatchOperation, InMemoryKVStore, KVStoreError, KeyValueStore, ScanResult,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Refuses the first `failures` batch writes, then behaves normally.
    struct FlakyKv {
        inner: InMemoryKVStore,
        failures: AtomicUsize,
    }

    impl FlakyKv {
        fn failing(failures: usize) -> Self {
            Self {
                inner: InMemoryKVStore::new(),
                failures: AtomicUsize::new(failures),
            }
        }
    }

    impl KeyValueStore for FlakyKv {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
            self.inner.get(key)
        }

        fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
            self.inner.put(key, value)
        }

        fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
            self.inner.delete(key)
        }

        fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
            let refuse = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refuse {
                return Err(KVStoreError::IOError {
                    message: "write stalled".into(),
                });
            }
            self.inner.atomic_batch_write(operations)
        }

        fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
            self.inner.exists(key)
        }

        fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
            self.inner.prefix_scan(prefix)
        }
    }

    struct Fixture {
        bus: InMemoryEventBus,
        service: Arc<NotificationService>,
        directory: Arc<StaticDirectory>,
        admin: Actor,
        staff: Actor,
        client: Actor,
    }

    fn enrol(directory: &StaticDirectory, name: &str, role: Role) -> Actor {
        let id = UserId::new();
        directory.insert(Member {
            id,
            name: name.into(),
            role,
            cid: None,
            active: true,
        });
        Actor {
            user_id: id,
            role,
            cid: None,
            name: name.into(),
        }
    }

    fn fixture() -> Fixture {
        fixture_on(Arc::new(InMemoryKVStore::new()))
    }

    fn fixture_on(kv: Arc<dyn KeyValueStore>) -> Fixture {
        let directory = Arc::new(StaticDirectory::new());
        let admin = enrol(&directory, "Admin", Role::Admin);
        let staff = enrol(&directory, "Staff", Role::Staff);
        let client = enrol(&directory, "Client", Role::Client);
        let service = Arc::new(NotificationService::new(
            kv,
            directory.clone(),
            Arc::new(FixedTimeSource::new(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap())),
        ));
        Fixture {
            bus: InMemoryEventBus::new(),
            service,
            directory,
            admin,
            staff,
            client,
        }
    }

    impl Fixture {
        fn router(&self) -> NotificationRouter {
            NotificationRouter::new(
                self.bus.subscribe(NotificationRouter::filter()),
                self.service.clone(),
                self.directory.clone(),
            )
        }

        fn inbox(&self, who: &Actor) -> Vec<String> {
            self.service
                .list(who, false, PageRequest::default())
                .unwrap()
                .items
                .into_iter()
                .map(|n| n.title)
                .collect()
        }
    }

    #[test]
    fn test_submissions_reach_reviewers() {
        let f = fixture();
        let router = f.router();
        let event = PortalEvent::BillSubmitted {
            actor: f.client.user_id,
            bill_id: BillId::new(),
            bill_number: "BILL-000007".into(),
            client_id: f.client.user_id,
            amount: Amount(12_550),
        };

        assert_eq!(router.route(&event), 2);
        assert_eq!(f.inbox(&f.admin), vec!["New bill submitted"]);
        assert_eq!(f.inbox(&f.staff), vec!["New bill submitted"]);
        assert!(f.inbox(&f.client).is_empty());

        let msg = &f.service.list(&f.staff, false, PageRequest::default()).unwrap().items[0];
        assert_eq!(msg.message, "BILL-000007 for 125.50 is waiting for review");
    }

    #[test]
    fn test_failed_delivery_does_not_stop_fan_out() {
        let f = fixture_on(Arc::new(FlakyKv::failing(1)));
        let router = f.router();
        let event = PortalEvent::BillSubmitted {
            actor: f.client.user_id,
            bill_id: BillId::new(),
            bill_number: "BILL-000008".into(),
            client_id: f.client.user_id,
            amount: Amount(9_900),
        };

        // Admins come first, so the admin's write is the one refused.
        assert_eq!(router.route(&event), 1);
        assert!(f.inbox(&f.admin).is_empty());
        assert_eq!(f.inbox(&f.staff), vec!["New bill submitted"]);
    }

    #[tokio::test]
    async fn test_shutdown_delivers_queued_events() {
        let f = fixture();
        let router = f.router();
        for n in 1..=3 {
            f.bus.publish(PortalEvent::BillReviewed {
                actor: f.staff.user_id,
                bill_id: BillId::new(),
                bill_number: format!("BILL-00000{n}"),
                client_id: f.client.user_id,
                approved: true,
            });
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), router.run_until(shutdown_rx))
            .await
            .expect("router should stop on shutdown");

        assert_eq!(f.service.delivered(), 3);
        assert_eq!(f.inbox(&f.client).len(), 3);
    }

    #[test]
    fn test_actor_is_not_notified() {
        let f = fixture();
        let router = f.router();
        f.directory.deactivate(&f.admin.user_id);

        let event = PortalEvent::PaymentRequested {
            actor: f.staff.user_id,
            payment_id: PaymentId::new(),
            client_id: f.client.user_id,
            amount: Amount(100),
        };
        // Staff is the actor and the admin is inactive: nobody left.
        assert_eq!(router.route(&event), 0);
    }

    #[test]
    fn test_direct_recipients() {
        let f = fixture();
        let router = f.router();

        router
            .route(&PortalEvent::PaymentDecided {
                actor: f.staff.user_id,
                payment_id: PaymentId::new(),
                client_id: f.client.user_id,
                approved: false,
            });
        router
            .route(&PortalEvent::DocumentForwarded {
                actor: f.client.user_id,
                document_id: DocumentId::new(),
                title: "Drawings".into(),
                from: f.client.user_id,
                to: f.staff.user_id,
            });
        assert_eq!(
            router
                .route(&PortalEvent::DocumentUploaded {
                    actor: f.client.user_id,
                    document_id: DocumentId::new(),
                    title: "Drawings".into(),
                }),
            0
        );

        assert_eq!(f.inbox(&f.client), vec!["Payment request rejected"]);
        assert_eq!(f.inbox(&f.staff), vec!["Document forwarded to you"]);
    }

    #[tokio::test]
    async fn test_run_consumes_bus() {
        let f = fixture();
        let handle = tokio::spawn(f.router().run());

        f.bus.publish(PortalEvent::BillReviewed {
            actor: f.staff.user_id,
            bill_id: BillId::new(),
            bill_number: "BILL-000001".into(),
            client_id: f.client.user_id,
            approved: true,
        });

        let mut delivered = false;
        for _ in 0..50 {
            if f.service.delivered() == 1 {
                delivered = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(delivered, "router did not deliver within 500ms");
        assert_eq!(f.inbox(&f.client), vec!["Bill approved"]);

        drop(f);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("router should stop once the bus is dropped")
            .unwrap();
    }
}
