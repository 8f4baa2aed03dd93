//! # Billing Service

use crate::domain::entities::{
    bill_number, Bill, BillFilter, BillStatus, BillSummary, BillUpdate, NewBill,
};
use crate::domain::errors::BillingError;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, PortalEvent};
use shared_types::{
    Actor, Amount, BillId, Decision, FileRef, Page, PageRequest, Scope, TimeSource,
};
use sl_02_record_store::{
    read_verified, store_file, BlobStore, Collection, KeyValueStore, Sequence, StoreError, Upload,
};
use std::sync::Arc;
use tracing::{info, warn};

pub struct BillingService {
    bills: Collection<Bill>,
    numbers: Sequence,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn TimeSource>,
    events: Arc<dyn EventPublisher>,
    write_lock: Mutex<()>,
}

fn required(field: &str, value: &str) -> Result<String, BillingError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BillingError::Invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn positive(amount: Amount) -> Result<Amount, BillingError> {
    if amount.is_zero() {
        return Err(BillingError::Invalid("amount must be greater than zero".into()));
    }
    Ok(amount)
}

impl BillingService {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn TimeSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            bills: Collection::new(kv.clone()),
            numbers: Sequence::new(kv, "bill"),
            blobs,
            clock,
            events,
            write_lock: Mutex::new(()),
        }
    }

    pub fn submit(&self, actor: &Actor, input: NewBill) -> Result<Bill, BillingError> {
        if !actor.is_client() {
            return Err(BillingError::Forbidden("only clients submit bills"));
        }
        let title = required("title", &input.title)?;
        let work_description = required("work_description", &input.work_description)?;
        let amount = positive(input.amount)?;

        let now = self.clock.now();
        let bill = Bill {
            id: BillId::new(),
            bill_number: bill_number(self.numbers.next()?),
            client_id: actor.user_id,
            cid: actor.cid.clone(),
            title,
            work_description,
            site: input.site.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            amount,
            bill_date: input.bill_date.unwrap_or_else(|| now.date_naive()),
            status: BillStatus::Pending,
            remarks: None,
            reviewed_by: None,
            reviewed_at: None,
            paid_at: None,
            attachment: None,
            created_at: now,
            updated_at: now,
        };
        self.bills.insert(&bill)?;

        info!(
            bill_id = %bill.id,
            bill_number = %bill.bill_number,
            client = %actor.user_id,
            amount = %bill.amount,
            "Bill submitted"
        );
        self.events.publish(PortalEvent::BillSubmitted {
            actor: actor.user_id,
            bill_id: bill.id,
            bill_number: bill.bill_number.clone(),
            client_id: bill.client_id,
            amount: bill.amount,
        });
        Ok(bill)
    }

    pub fn get(&self, actor: &Actor, id: BillId) -> Result<Bill, BillingError> {
        let bill = self
            .bills
            .get(&id.to_string())?
            .ok_or(BillingError::NotFound(id))?;
        if !actor.scope().includes(&bill.client_id) {
            return Err(BillingError::NotFound(id));
        }
        Ok(bill)
    }

    /// Newest first. Clients only ever see their own bills.
    pub fn list(
        &self,
        actor: &Actor,
        filter: &BillFilter,
        page: PageRequest,
    ) -> Result<Page<Bill>, BillingError> {
        let mut bills = match actor.scope() {
            Scope::Client(id) => self.bills.find_by_index("client", &id.to_string())?,
            Scope::All => match filter.status {
                Some(status) => self.bills.find_by_index("status", status.as_str())?,
                None => self.bills.all()?,
            },
        };
        bills.retain(|b| {
            filter.status.map_or(true, |s| b.status == s)
                && filter.cid.as_ref().map_or(true, |c| b.cid.as_ref() == Some(c))
        });
        bills.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.bill_number.cmp(&a.bill_number))
        });
        Ok(page.apply(bills))
    }

    /// Owner edits while the bill is still pending.
    pub fn update(
        &self,
        actor: &Actor,
        id: BillId,
        update: BillUpdate,
    ) -> Result<Bill, BillingError> {
        let title = update.title.as_deref().map(|t| required("title", t)).transpose()?;
        let work_description = update
            .work_description
            .as_deref()
            .map(|w| required("work_description", w))
            .transpose()?;
        let amount = update.amount.map(positive).transpose()?;
        let now = self.clock.now();

        let _guard = self.write_lock.lock();
        self.get(actor, id)?;
        self.bills.update(&id.to_string(), |bill: &mut Bill| {
            Self::ensure_owner_pending(actor, bill)?;
            if let Some(title) = title {
                bill.title = title;
            }
            if let Some(work_description) = work_description {
                bill.work_description = work_description;
            }
            if let Some(site) = update.site {
                bill.site = Some(site.trim().to_string()).filter(|s| !s.is_empty());
            }
            if let Some(amount) = amount {
                bill.amount = amount;
            }
            if let Some(date) = update.bill_date {
                bill.bill_date = date;
            }
            bill.updated_at = now;
            Ok::<(), BillingError>(())
        })
    }

    /// Attach (or replace) the supporting file of a pending bill.
    pub fn attach(&self, actor: &Actor, id: BillId, upload: &Upload) -> Result<Bill, BillingError> {
        let _guard = self.write_lock.lock();
        let bill = self.get(actor, id)?;
        Self::ensure_owner_pending(actor, &bill)?;

        let file = store_file(self.blobs.as_ref(), &format!("bills/{id}"), upload)?;
        let previous = bill.attachment.clone();
        let now = self.clock.now();
        let same_key = |old: &FileRef| old.key == file.key;
        let updated = match self.bills.update::<BillingError, _>(&id.to_string(), |bill| {
            bill.attachment = Some(file.clone());
            bill.updated_at = now;
            Ok(())
        }) {
            Ok(updated) => updated,
            Err(e) => {
                if !previous.as_ref().is_some_and(same_key) {
                    if let Err(cleanup) = self.blobs.delete(&file.key) {
                        warn!(bill_id = %id, error = %cleanup, "Orphaned attachment left in blob store");
                    }
                }
                return Err(e);
            }
        };
        if let Some(old) = previous.filter(|old| !same_key(old)) {
            if let Err(e) = self.blobs.delete(&old.key) {
                warn!(bill_id = %id, error = %e, "Replaced attachment could not be deleted");
            }
        }
        info!(bill_id = %id, file = %file.file_name, size = file.size, "Bill attachment stored");
        Ok(updated)
    }

    pub fn attachment(&self, actor: &Actor, id: BillId) -> Result<(FileRef, Vec<u8>), BillingError> {
        let bill = self.get(actor, id)?;
        let file = bill
            .attachment
            .ok_or_else(|| BillingError::Invalid("bill has no attachment".into()))?;
        let bytes = read_verified(self.blobs.as_ref(), &file)?;
        Ok((file, bytes))
    }

    /// Staff or admin approves or rejects a pending bill. Rejection needs a
    /// remark so the client knows what to fix.
    pub fn review(
        &self,
        actor: &Actor,
        id: BillId,
        decision: Decision,
        remarks: Option<String>,
    ) -> Result<Bill, BillingError> {
        if !actor.is_reviewer() {
            return Err(BillingError::Forbidden("only staff review bills"));
        }
        let remarks = remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if decision == Decision::Reject && remarks.is_none() {
            return Err(BillingError::Invalid("a rejection needs remarks".into()));
        }
        let next = match decision {
            Decision::Approve => BillStatus::Approved,
            Decision::Reject => BillStatus::Rejected,
        };
        let now = self.clock.now();

        let _guard = self.write_lock.lock();
        let bill = self
            .bills
            .update(&id.to_string(), |bill: &mut Bill| {
                bill.status = bill.status.transition(next)?;
                bill.remarks = remarks;
                bill.reviewed_by = Some(actor.user_id);
                bill.reviewed_at = Some(now);
                bill.updated_at = now;
                Ok::<(), BillingError>(())
            })
            .map_err(|e| not_found_as(e, id))?;

        info!(bill_id = %id, reviewer = %actor.user_id, status = %bill.status, "Bill reviewed");
        self.events.publish(PortalEvent::BillReviewed {
            actor: actor.user_id,
            bill_id: bill.id,
            bill_number: bill.bill_number.clone(),
            client_id: bill.client_id,
            approved: decision.is_approve(),
        });
        Ok(bill)
    }

    /// Admin settles an approved bill.
    pub fn mark_paid(&self, actor: &Actor, id: BillId) -> Result<Bill, BillingError> {
        if !actor.is_admin() {
            return Err(BillingError::Forbidden("only admins mark bills paid"));
        }
        let now = self.clock.now();

        let _guard = self.write_lock.lock();
        let bill = self
            .bills
            .update(&id.to_string(), |bill: &mut Bill| {
                bill.status = bill.status.transition(BillStatus::Paid)?;
                bill.paid_at = Some(now);
                bill.updated_at = now;
                Ok::<(), BillingError>(())
            })
            .map_err(|e| not_found_as(e, id))?;

        info!(bill_id = %id, amount = %bill.amount, "Bill paid");
        self.events.publish(PortalEvent::BillPaid {
            actor: actor.user_id,
            bill_id: bill.id,
            bill_number: bill.bill_number.clone(),
            client_id: bill.client_id,
            amount: bill.amount,
        });
        Ok(bill)
    }

    /// Owner withdraws a pending bill; admins may delete any bill.
    pub fn delete(&self, actor: &Actor, id: BillId) -> Result<(), BillingError> {
        let _guard = self.write_lock.lock();
        let bill = self.get(actor, id)?;
        if !actor.is_admin() {
            Self::ensure_owner_pending(actor, &bill)?;
        }
        self.bills.delete(&id.to_string())?;
        if let Some(file) = &bill.attachment {
            if let Err(e) = self.blobs.delete(&file.key) {
                warn!(bill_id = %id, error = %e, "Bill removed but its attachment could not be deleted");
            }
        }
        info!(bill_id = %id, actor = %actor.user_id, "Bill deleted");
        Ok(())
    }

    pub fn summary(&self, scope: Scope) -> Result<BillSummary, BillingError> {
        let bills = match scope {
            Scope::Client(id) => self.bills.find_by_index("client", &id.to_string())?,
            Scope::All => self.bills.all()?,
        };
        let mut summary = BillSummary::default();
        bills.iter().for_each(|b| summary.add(b));
        Ok(summary)
    }

    fn ensure_owner_pending(actor: &Actor, bill: &Bill) -> Result<(), BillingError> {
        if bill.client_id != actor.user_id {
            return Err(BillingError::Forbidden("only the submitting client may change a bill"));
        }
        if bill.status != BillStatus::Pending {
            return Err(BillingError::Locked(bill.status));
        }
        Ok(())
    }
}

fn not_found_as(err: BillingError, id: BillId) -> BillingError {
    match err {
        BillingError::Storage(StoreError::NotFound { .. }) => BillingError::NotFound(id),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use shared_bus::RecordingPublisher;
    use shared_types::{Cid, Classify, ErrorKind, FixedTimeSource, Role, UserId};
    use sl_02_record_store::{BlobError, InMemoryBlobStore, InMemoryKVStore};

    /// Stores and reads normally but can never remove anything.
    #[derive(Default)]
    struct UndeletableBlobs {
        inner: InMemoryBlobStore,
    }

    impl BlobStore for UndeletableBlobs {
        fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
            self.inner.put(key, bytes)
        }

        fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
            self.inner.get(key)
        }

        fn delete(&self, _key: &str) -> Result<(), BlobError> {
            Err(BlobError::Io("disk busy".into()))
        }
    }

    struct Fixture {
        service: BillingService,
        clock: Arc<FixedTimeSource>,
        events: Arc<RecordingPublisher>,
    }

    fn fixture() -> Fixture {
        fixture_with_blobs(Arc::new(InMemoryBlobStore::new()))
    }

    fn fixture_with_blobs(blobs: Arc<dyn BlobStore>) -> Fixture {
        let clock = Arc::new(FixedTimeSource::new(
            Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap(),
        ));
        let events = Arc::new(RecordingPublisher::new());
        let service = BillingService::new(
            Arc::new(InMemoryKVStore::new()),
            blobs,
            clock.clone(),
            events.clone(),
        );
        Fixture {
            service,
            clock,
            events,
        }
    }

    fn actor(role: Role, n: u64) -> Actor {
        Actor {
            user_id: UserId::new(),
            role,
            cid: (role == Role::Client).then(|| Cid::from_sequence(n)),
            name: format!("{role}-{n}"),
        }
    }

    fn new_bill(amount: u64) -> NewBill {
        NewBill {
            title: "Foundation work".into(),
            work_description: "Excavation and footing, block C".into(),
            site: Some("Plot 14".into()),
            amount: Amount(amount),
            bill_date: None,
        }
    }

    #[test]
    fn test_submit_assigns_number_and_defaults() {
        let f = fixture();
        let client = actor(Role::Client, 1);

        let first = f.service.submit(&client, new_bill(150_000)).unwrap();
        let second = f.service.submit(&client, new_bill(99)).unwrap();

        assert_eq!(first.bill_number, "BILL-000001");
        assert_eq!(second.bill_number, "BILL-000002");
        assert_eq!(first.status, BillStatus::Pending);
        assert_eq!(first.cid, client.cid);
        assert_eq!(first.bill_date, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert!(matches!(
            f.events.events()[0],
            PortalEvent::BillSubmitted { ref bill_number, .. } if bill_number == "BILL-000001"
        ));
    }

    #[test]
    fn test_submit_validation() {
        let f = fixture();
        let client = actor(Role::Client, 1);

        assert!(matches!(
            f.service.submit(&client, new_bill(0)),
            Err(BillingError::Invalid(_))
        ));
        let mut blank = new_bill(10);
        blank.title = "   ".into();
        assert!(matches!(f.service.submit(&client, blank), Err(BillingError::Invalid(_))));
        assert!(matches!(
            f.service.submit(&actor(Role::Staff, 0), new_bill(10)),
            Err(BillingError::Forbidden(_))
        ));
    }

    #[test]
    fn test_tenant_isolation() {
        let f = fixture();
        let alice = actor(Role::Client, 1);
        let bob = actor(Role::Client, 2);
        let staff = actor(Role::Staff, 0);

        let bill = f.service.submit(&alice, new_bill(500)).unwrap();
        f.service.submit(&bob, new_bill(700)).unwrap();

        assert_eq!(f.service.get(&bob, bill.id), Err(BillingError::NotFound(bill.id)));
        assert!(f.service.get(&staff, bill.id).is_ok());

        let mine = f.service.list(&alice, &BillFilter::default(), PageRequest::default()).unwrap();
        assert_eq!(mine.total, 1);
        let everything = f.service.list(&staff, &BillFilter::default(), PageRequest::default()).unwrap();
        assert_eq!(everything.total, 2);
        let only_bob = f
            .service
            .list(
                &staff,
                &BillFilter { cid: bob.cid.clone(), ..Default::default() },
                PageRequest::default(),
            )
            .unwrap();
        assert_eq!(only_bob.items[0].amount, Amount(700));
    }

    #[test]
    fn test_list_newest_first() {
        let f = fixture();
        let client = actor(Role::Client, 1);
        f.service.submit(&client, new_bill(1)).unwrap();
        f.clock.advance(chrono::Duration::minutes(1));
        f.service.submit(&client, new_bill(2)).unwrap();

        let page = f.service.list(&client, &BillFilter::default(), PageRequest::default()).unwrap();
        assert_eq!(page.items[0].amount, Amount(2));
    }

    #[test]
    fn test_review_lifecycle() {
        let f = fixture();
        let client = actor(Role::Client, 1);
        let staff = actor(Role::Staff, 0);
        let admin = actor(Role::Admin, 0);
        let bill = f.service.submit(&client, new_bill(500)).unwrap();

        assert!(matches!(
            f.service.review(&client, bill.id, Decision::Approve, None),
            Err(BillingError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.mark_paid(&admin, bill.id),
            Err(BillingError::InvalidTransition { from: BillStatus::Pending, to: BillStatus::Paid })
        ));

        let approved = f.service.review(&staff, bill.id, Decision::Approve, None).unwrap();
        assert_eq!(approved.status, BillStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(staff.user_id));

        assert!(matches!(
            f.service.review(&staff, bill.id, Decision::Reject, Some("late".into())),
            Err(BillingError::InvalidTransition { .. })
        ));
        assert!(matches!(
            f.service.mark_paid(&staff, bill.id),
            Err(BillingError::Forbidden(_))
        ));

        let paid = f.service.mark_paid(&admin, bill.id).unwrap();
        assert_eq!(paid.status, BillStatus::Paid);
        assert!(paid.paid_at.is_some());
        assert_eq!(f.events.events().len(), 3);
    }

    #[test]
    fn test_reject_requires_remarks() {
        let f = fixture();
        let client = actor(Role::Client, 1);
        let staff = actor(Role::Staff, 0);
        let bill = f.service.submit(&client, new_bill(500)).unwrap();

        assert!(matches!(
            f.service.review(&staff, bill.id, Decision::Reject, Some("  ".into())),
            Err(BillingError::Invalid(_))
        ));
        let rejected = f
            .service
            .review(&staff, bill.id, Decision::Reject, Some("Missing measurements".into()))
            .unwrap();
        assert_eq!(rejected.remarks.as_deref(), Some("Missing measurements"));
        let missing = BillId::new();
        assert_eq!(
            f.service.review(&staff, missing, Decision::Approve, None),
            Err(BillingError::NotFound(missing))
        );
    }

    #[test]
    fn test_update_only_while_pending() {
        let f = fixture();
        let client = actor(Role::Client, 1);
        let staff = actor(Role::Staff, 0);
        let bill = f.service.submit(&client, new_bill(500)).unwrap();

        let updated = f
            .service
            .update(&client, bill.id, BillUpdate { amount: Some(Amount(650)), ..Default::default() })
            .unwrap();
        assert_eq!(updated.amount, Amount(650));

        assert!(matches!(
            f.service.update(&staff, bill.id, BillUpdate::default()),
            Err(BillingError::Forbidden(_))
        ));

        f.service.review(&staff, bill.id, Decision::Approve, None).unwrap();
        assert!(matches!(
            f.service.update(&client, bill.id, BillUpdate { amount: Some(Amount(1)), ..Default::default() }),
            Err(BillingError::Locked(BillStatus::Approved))
        ));
    }

    #[test]
    fn test_attachment_roundtrip_and_delete() {
        let f = fixture();
        let client = actor(Role::Client, 1);
        let admin = actor(Role::Admin, 0);
        let bill = f.service.submit(&client, new_bill(500)).unwrap();

        let upload = Upload::new("measurements.pdf", "application/pdf", b"%PDF-data".to_vec());
        let with_file = f.service.attach(&client, bill.id, &upload).unwrap();
        assert_eq!(with_file.attachment.as_ref().map(|a| a.size), Some(9));

        let (file, bytes) = f.service.attachment(&admin, bill.id).unwrap();
        assert_eq!(file.file_name, "measurements.pdf");
        assert_eq!(bytes, b"%PDF-data");

        f.service.delete(&admin, bill.id).unwrap();
        assert_eq!(f.service.get(&admin, bill.id), Err(BillingError::NotFound(bill.id)));
    }

    #[test]
    fn test_blob_cleanup_failure_does_not_fail_committed_change() {
        let f = fixture_with_blobs(Arc::new(UndeletableBlobs::default()));
        let client = actor(Role::Client, 1);
        let bill = f.service.submit(&client, new_bill(500)).unwrap();

        let first = Upload::new("draft.pdf", "application/pdf", b"draft".to_vec());
        f.service.attach(&client, bill.id, &first).unwrap();
        let second = Upload::new("final.pdf", "application/pdf", b"final".to_vec());
        let replaced = f.service.attach(&client, bill.id, &second).unwrap();
        assert_eq!(replaced.attachment.map(|a| a.file_name), Some("final.pdf".to_string()));

        assert_eq!(f.service.delete(&client, bill.id), Ok(()));
        assert_eq!(f.service.get(&client, bill.id), Err(BillingError::NotFound(bill.id)));
    }

    #[test]
    fn test_client_delete_rules() {
        let f = fixture();
        let client = actor(Role::Client, 1);
        let staff = actor(Role::Staff, 0);
        let pending = f.service.submit(&client, new_bill(1)).unwrap();
        let approved = f.service.submit(&client, new_bill(2)).unwrap();
        f.service.review(&staff, approved.id, Decision::Approve, None).unwrap();

        f.service.delete(&client, pending.id).unwrap();
        assert!(matches!(
            f.service.delete(&client, approved.id),
            Err(BillingError::Locked(BillStatus::Approved))
        ));
        let upload = Upload::new("late.pdf", "application/pdf", b"late".to_vec());
        assert_eq!(
            f.service.attach(&client, approved.id, &upload),
            Err(BillingError::Locked(BillStatus::Approved))
        );
        assert_eq!(BillingError::Locked(BillStatus::Approved).kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_summary_by_scope() {
        let f = fixture();
        let alice = actor(Role::Client, 1);
        let bob = actor(Role::Client, 2);
        let staff = actor(Role::Staff, 0);
        let a1 = f.service.submit(&alice, new_bill(100)).unwrap();
        f.service.submit(&alice, new_bill(200)).unwrap();
        f.service.submit(&bob, new_bill(400)).unwrap();
        f.service.review(&staff, a1.id, Decision::Approve, None).unwrap();

        let all = f.service.summary(Scope::All).unwrap();
        assert_eq!(all.total.count, 3);
        assert_eq!(all.total.amount, Amount(700));
        assert_eq!(all.approved.amount, Amount(100));

        let mine = f.service.summary(alice.scope()).unwrap();
        assert_eq!(mine.total.amount, Amount(300));
        assert_eq!(mine.pending.count, 1);
    }
}
