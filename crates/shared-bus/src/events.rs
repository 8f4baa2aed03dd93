//! # Portal Events
//!
//! Defines all event types that flow through the shared bus.
//! Every event carries the `actor` that caused it so consumers can avoid
//! echoing an action back to the person who performed it.

use serde::{Deserialize, Serialize};
use shared_types::{AgreementId, Amount, BillId, Cid, DocumentId, PaymentId, Role, UserId};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortalEvent {
    // =========================================================================
    // IDENTITY
    // =========================================================================
    /// An account was created.
    UserCreated {
        actor: UserId,
        user_id: UserId,
        role: Role,
        cid: Option<Cid>,
    },

    // =========================================================================
    // BILLING
    // =========================================================================
    /// A client submitted a bill for review.
    BillSubmitted {
        actor: UserId,
        bill_id: BillId,
        bill_number: String,
        client_id: UserId,
        amount: Amount,
    },

    /// A reviewer approved or rejected a bill.
    BillReviewed {
        actor: UserId,
        bill_id: BillId,
        bill_number: String,
        client_id: UserId,
        approved: bool,
    },

    /// An approved bill was settled.
    BillPaid {
        actor: UserId,
        bill_id: BillId,
        bill_number: String,
        client_id: UserId,
        amount: Amount,
    },

    // =========================================================================
    // PAYMENT REQUESTS
    // =========================================================================
    /// A client asked for a reimbursement or an advance.
    PaymentRequested {
        actor: UserId,
        payment_id: PaymentId,
        client_id: UserId,
        amount: Amount,
    },

    /// A reviewer decided a payment request.
    PaymentDecided {
        actor: UserId,
        payment_id: PaymentId,
        client_id: UserId,
        approved: bool,
    },

    // =========================================================================
    // DOCUMENT FORWARDING
    // =========================================================================
    /// A document entered the forwarding system.
    DocumentUploaded {
        actor: UserId,
        document_id: DocumentId,
        title: String,
    },

    /// Custody of a document moved to another member.
    DocumentForwarded {
        actor: UserId,
        document_id: DocumentId,
        title: String,
        from: UserId,
        to: UserId,
    },

    /// A document's review status changed.
    DocumentStatusChanged {
        actor: UserId,
        document_id: DocumentId,
        title: String,
        uploaded_by: UserId,
        status: String,
    },

    // =========================================================================
    // AGREEMENTS
    // =========================================================================
    /// An agreement was sent to a client.
    AgreementIssued {
        actor: UserId,
        agreement_id: AgreementId,
        title: String,
        client_id: UserId,
    },

    /// The client opened the agreement for the first time.
    AgreementViewed {
        actor: UserId,
        agreement_id: AgreementId,
        issued_by: UserId,
    },

    /// The client signed the agreement.
    AgreementSigned {
        actor: UserId,
        agreement_id: AgreementId,
        title: String,
        issued_by: UserId,
    },

    /// The client declined the agreement.
    AgreementRejected {
        actor: UserId,
        agreement_id: AgreementId,
        title: String,
        issued_by: UserId,
        reason: String,
    },
}

impl PortalEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::UserCreated { .. } => EventTopic::Identity,
            Self::BillSubmitted { .. } | Self::BillReviewed { .. } | Self::BillPaid { .. } => {
                EventTopic::Billing
            }
            Self::PaymentRequested { .. } | Self::PaymentDecided { .. } => EventTopic::Payments,
            Self::DocumentUploaded { .. }
            | Self::DocumentForwarded { .. }
            | Self::DocumentStatusChanged { .. } => EventTopic::Documents,
            Self::AgreementIssued { .. }
            | Self::AgreementViewed { .. }
            | Self::AgreementSigned { .. }
            | Self::AgreementRejected { .. } => EventTopic::Agreements,
        }
    }

    /// The user whose action produced this event.
    #[must_use]
    pub fn actor(&self) -> UserId {
        match self {
            Self::UserCreated { actor, .. }
            | Self::BillSubmitted { actor, .. }
            | Self::BillReviewed { actor, .. }
            | Self::BillPaid { actor, .. }
            | Self::PaymentRequested { actor, .. }
            | Self::PaymentDecided { actor, .. }
            | Self::DocumentUploaded { actor, .. }
            | Self::DocumentForwarded { actor, .. }
            | Self::DocumentStatusChanged { actor, .. }
            | Self::AgreementIssued { actor, .. }
            | Self::AgreementViewed { actor, .. }
            | Self::AgreementSigned { actor, .. }
            | Self::AgreementRejected { actor, .. } => *actor,
        }
    }

    /// Short stable name, used in logs and metrics labels.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserCreated { .. } => "user_created",
            Self::BillSubmitted { .. } => "bill_submitted",
            Self::BillReviewed { .. } => "bill_reviewed",
            Self::BillPaid { .. } => "bill_paid",
            Self::PaymentRequested { .. } => "payment_requested",
            Self::PaymentDecided { .. } => "payment_decided",
            Self::DocumentUploaded { .. } => "document_uploaded",
            Self::DocumentForwarded { .. } => "document_forwarded",
            Self::DocumentStatusChanged { .. } => "document_status_changed",
            Self::AgreementIssued { .. } => "agreement_issued",
            Self::AgreementViewed { .. } => "agreement_viewed",
            Self::AgreementSigned { .. } => "agreement_signed",
            Self::AgreementRejected { .. } => "agreement_rejected",
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Account lifecycle.
    Identity,
    /// Bill submission, review and settlement.
    Billing,
    /// Payment requests.
    Payments,
    /// Document forwarding.
    Documents,
    /// Client agreements.
    Agreements,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &PortalEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
