//! # Payment Service

use crate::domain::entities::{
    NewPaymentRequest, PaymentFilter, PaymentRequest, PaymentStatus, PaymentSummary,
};
use crate::domain::errors::PaymentError;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, PortalEvent};
use shared_types::{Actor, Decision, Page, PageRequest, PaymentId, Scope, TimeSource};
use sl_02_record_store::{Collection, KeyValueStore, StoreError};
use std::sync::Arc;
use tracing::info;

pub struct PaymentService {
    payments: Collection<PaymentRequest>,
    clock: Arc<dyn TimeSource>,
    events: Arc<dyn EventPublisher>,
    write_lock: Mutex<()>,
}

impl PaymentService {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn TimeSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            payments: Collection::new(kv),
            clock,
            events,
            write_lock: Mutex::new(()),
        }
    }

    pub fn request(
        &self,
        actor: &Actor,
        input: NewPaymentRequest,
    ) -> Result<PaymentRequest, PaymentError> {
        if !actor.is_client() {
            return Err(PaymentError::Forbidden("only clients request payments"));
        }
        if input.amount.is_zero() {
            return Err(PaymentError::Invalid("amount must be greater than zero".into()));
        }
        let purpose = input.purpose.trim();
        if purpose.is_empty() {
            return Err(PaymentError::Invalid("purpose is required".into()));
        }

        let now = self.clock.now();
        let payment = PaymentRequest {
            id: PaymentId::new(),
            client_id: actor.user_id,
            cid: actor.cid.clone(),
            kind: input.kind,
            amount: input.amount,
            purpose: purpose.to_string(),
            status: PaymentStatus::Pending,
            decision_note: None,
            decided_by: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        };
        self.payments.insert(&payment)?;

        info!(
            payment_id = %payment.id,
            client = %actor.user_id,
            kind = ?payment.kind,
            amount = %payment.amount,
            "Payment requested"
        );
        self.events.publish(PortalEvent::PaymentRequested {
            actor: actor.user_id,
            payment_id: payment.id,
            client_id: payment.client_id,
            amount: payment.amount,
        });
        Ok(payment)
    }

    pub fn get(&self, actor: &Actor, id: PaymentId) -> Result<PaymentRequest, PaymentError> {
        match self.payments.get(&id.to_string())? {
            Some(p) if actor.scope().includes(&p.client_id) => Ok(p),
            _ => Err(PaymentError::NotFound(id)),
        }
    }

    pub fn list(
        &self,
        actor: &Actor,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> Result<Page<PaymentRequest>, PaymentError> {
        let mut payments = self.scoped(actor.scope())?;
        payments.retain(|p| filter.matches(p));
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(payments))
    }

    /// Approve or reject a pending request.
    pub fn decide(
        &self,
        actor: &Actor,
        id: PaymentId,
        decision: Decision,
        note: Option<String>,
    ) -> Result<PaymentRequest, PaymentError> {
        if !actor.is_reviewer() {
            return Err(PaymentError::Forbidden("only staff decide payment requests"));
        }
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let now = self.clock.now();

        let _guard = self.write_lock.lock();
        let payment = self
            .payments
            .update(&id.to_string(), |p: &mut PaymentRequest| {
                if p.status != PaymentStatus::Pending {
                    return Err(PaymentError::AlreadyDecided(p.status));
                }
                p.status = match decision {
                    Decision::Approve => PaymentStatus::Approved,
                    Decision::Reject => PaymentStatus::Rejected,
                };
                p.decision_note = note;
                p.decided_by = Some(actor.user_id);
                p.decided_at = Some(now);
                p.updated_at = now;
                Ok(())
            })
            .map_err(|e| match e {
                PaymentError::Storage(StoreError::NotFound { .. }) => PaymentError::NotFound(id),
                other => other,
            })?;

        info!(payment_id = %id, reviewer = %actor.user_id, status = %payment.status, "Payment decided");
        self.events.publish(PortalEvent::PaymentDecided {
            actor: actor.user_id,
            payment_id: payment.id,
            client_id: payment.client_id,
            approved: decision.is_approve(),
        });
        Ok(payment)
    }

    /// The owner withdraws a request nobody has decided yet.
    pub fn cancel(&self, actor: &Actor, id: PaymentId) -> Result<(), PaymentError> {
        let _guard = self.write_lock.lock();
        let payment = self.get(actor, id)?;
        if payment.client_id != actor.user_id {
            return Err(PaymentError::Forbidden("only the requesting client may cancel"));
        }
        if payment.status != PaymentStatus::Pending {
            return Err(PaymentError::AlreadyDecided(payment.status));
        }
        self.payments.delete(&id.to_string())?;
        info!(payment_id = %id, "Payment request cancelled");
        Ok(())
    }

    pub fn summary(&self, scope: Scope) -> Result<PaymentSummary, PaymentError> {
        let mut summary = PaymentSummary::default();
        for payment in self.scoped(scope)? {
            summary.add(&payment);
        }
        Ok(summary)
    }

    fn scoped(&self, scope: Scope) -> Result<Vec<PaymentRequest>, StoreError> {
        match scope {
            Scope::Client(id) => self.payments.find_by_index("client", &id.to_string()),
            Scope::All => self.payments.all(),
        }
    }
}
