//! # Agreement Service

use crate::domain::entities::{
    Agreement, AgreementFilter, AgreementStatus, AgreementSummary, NewAgreement, Signature,
};
use crate::domain::errors::AgreementError;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, PortalEvent};
use shared_types::{
    Actor, AgreementId, Directory, FileRef, Page, PageRequest, Role, Scope, TimeSource,
};
use sl_02_record_store::{
    read_verified, store_file, BlobStore, Collection, KeyValueStore, StoreError, Upload,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AgreementService {
    agreements: Collection<Agreement>,
    blobs: Arc<dyn BlobStore>,
    directory: Arc<dyn Directory>,
    clock: Arc<dyn TimeSource>,
    events: Arc<dyn EventPublisher>,
    write_lock: Mutex<()>,
}

fn required(field: &str, value: &str) -> Result<String, AgreementError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AgreementError::Invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn not_found_as(err: AgreementError, id: AgreementId) -> AgreementError {
    match err {
        AgreementError::Storage(StoreError::NotFound { .. }) => AgreementError::NotFound(id),
        other => other,
    }
}

impl AgreementService {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        blobs: Arc<dyn BlobStore>,
        directory: Arc<dyn Directory>,
        clock: Arc<dyn TimeSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            agreements: Collection::new(kv),
            blobs,
            directory,
            clock,
            events,
            write_lock: Mutex::new(()),
        }
    }

    /// Staff or admin sends an agreement to one active client.
    pub fn issue(
        &self,
        actor: &Actor,
        input: NewAgreement,
        upload: &Upload,
    ) -> Result<Agreement, AgreementError> {
        if !actor.is_reviewer() {
            return Err(AgreementError::Forbidden("only staff issue agreements"));
        }
        let title = required("title", &input.title)?;
        if upload.bytes.is_empty() {
            return Err(AgreementError::Invalid("agreement file is empty".into()));
        }
        let client = self
            .directory
            .member(&input.client_id)
            .filter(|m| m.active && m.role == Role::Client)
            .ok_or(AgreementError::NotAClient(input.client_id))?;

        let id = AgreementId::new();
        let file = store_file(self.blobs.as_ref(), &format!("agreements/{id}"), upload)?;
        let now = self.clock.now();
        let agreement = Agreement {
            id,
            client_id: client.id,
            cid: client.cid,
            title,
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            file,
            status: AgreementStatus::Sent,
            issued_by: actor.user_id,
            viewed_at: None,
            signed_at: None,
            signature: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = self.agreements.insert(&agreement) {
            if let Err(cleanup) = self.blobs.delete(&agreement.file.key) {
                warn!(agreement_id = %id, error = %cleanup, "Orphaned agreement file left in blob store");
            }
            return Err(e.into());
        }

        info!(
            agreement_id = %id,
            client = %agreement.client_id,
            issuer = %actor.user_id,
            "Agreement issued"
        );
        self.events.publish(PortalEvent::AgreementIssued {
            actor: actor.user_id,
            agreement_id: id,
            title: agreement.title.clone(),
            client_id: agreement.client_id,
        });
        Ok(agreement)
    }

    pub fn get(&self, actor: &Actor, id: AgreementId) -> Result<Agreement, AgreementError> {
        match self.agreements.get(&id.to_string())? {
            Some(a) if actor.scope().includes(&a.client_id) => Ok(a),
            _ => Err(AgreementError::NotFound(id)),
        }
    }

    pub fn list(
        &self,
        actor: &Actor,
        filter: &AgreementFilter,
        page: PageRequest,
    ) -> Result<Page<Agreement>, AgreementError> {
        let mut agreements = self.scoped(actor.scope())?;
        agreements.retain(|a| {
            filter.status.map_or(true, |s| a.status == s)
                && filter.cid.as_ref().map_or(true, |c| a.cid.as_ref() == Some(c))
        });
        agreements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(agreements))
    }

    /// Fetch an agreement; the addressed client opening a `sent` agreement
    /// marks it viewed.
    pub fn open(&self, actor: &Actor, id: AgreementId) -> Result<Agreement, AgreementError> {
        let agreement = self.get(actor, id)?;
        if agreement.client_id != actor.user_id || agreement.status != AgreementStatus::Sent {
            return Ok(agreement);
        }

        let now = self.clock.now();
        let _guard = self.write_lock.lock();
        let agreement = self
            .agreements
            .update(&id.to_string(), |a: &mut Agreement| {
                if a.status == AgreementStatus::Sent {
                    a.status = AgreementStatus::Viewed;
                    a.viewed_at = Some(now);
                    a.updated_at = now;
                }
                Ok::<(), AgreementError>(())
            })
            .map_err(|e| not_found_as(e, id))?;

        debug!(agreement_id = %id, "Agreement viewed");
        self.events.publish(PortalEvent::AgreementViewed {
            actor: actor.user_id,
            agreement_id: id,
            issued_by: agreement.issued_by,
        });
        Ok(agreement)
    }

    /// The addressed client accepts by typing their name.
    pub fn sign(
        &self,
        actor: &Actor,
        id: AgreementId,
        signer_name: &str,
    ) -> Result<Agreement, AgreementError> {
        let signer_name = required("signer_name", signer_name)?;
        let now = self.clock.now();
        let agreement = self.client_decision(actor, id, AgreementStatus::Signed, |a| {
            a.signed_at = Some(now);
            a.signature = Some(Signature {
                signer_name,
                signed_at: now,
            });
        })?;

        info!(agreement_id = %id, client = %actor.user_id, "Agreement signed");
        self.events.publish(PortalEvent::AgreementSigned {
            actor: actor.user_id,
            agreement_id: id,
            title: agreement.title.clone(),
            issued_by: agreement.issued_by,
        });
        Ok(agreement)
    }

    pub fn reject(
        &self,
        actor: &Actor,
        id: AgreementId,
        reason: &str,
    ) -> Result<Agreement, AgreementError> {
        let reason = required("reason", reason)?;
        let agreement = self.client_decision(actor, id, AgreementStatus::Rejected, |a| {
            a.rejection_reason = Some(reason.clone());
        })?;

        info!(agreement_id = %id, client = %actor.user_id, "Agreement rejected");
        self.events.publish(PortalEvent::AgreementRejected {
            actor: actor.user_id,
            agreement_id: id,
            title: agreement.title.clone(),
            issued_by: agreement.issued_by,
            reason,
        });
        Ok(agreement)
    }

    /// The issuer or an admin pulls an agreement the client has not decided.
    pub fn withdraw(&self, actor: &Actor, id: AgreementId) -> Result<Agreement, AgreementError> {
        let now = self.clock.now();
        let _guard = self.write_lock.lock();
        let current = self.get(actor, id)?;
        if !(actor.is_admin() || current.issued_by == actor.user_id) {
            return Err(AgreementError::Forbidden("only the issuer or an admin may withdraw"));
        }
        let agreement = self
            .agreements
            .update(&id.to_string(), |a: &mut Agreement| {
                a.status = a.status.transition(AgreementStatus::Withdrawn)?;
                a.updated_at = now;
                Ok::<(), AgreementError>(())
            })
            .map_err(|e| not_found_as(e, id))?;
        info!(agreement_id = %id, by = %actor.user_id, "Agreement withdrawn");
        Ok(agreement)
    }

    pub fn download(
        &self,
        actor: &Actor,
        id: AgreementId,
    ) -> Result<(FileRef, Vec<u8>), AgreementError> {
        let agreement = self.get(actor, id)?;
        let bytes = read_verified(self.blobs.as_ref(), &agreement.file)?;
        Ok((agreement.file, bytes))
    }

    /// Admins remove agreements that were never signed.
    pub fn delete(&self, actor: &Actor, id: AgreementId) -> Result<(), AgreementError> {
        if !actor.is_admin() {
            return Err(AgreementError::Forbidden("only admins delete agreements"));
        }
        let _guard = self.write_lock.lock();
        let agreement = self.get(actor, id)?;
        if agreement.status == AgreementStatus::Signed {
            return Err(AgreementError::Forbidden("signed agreements are kept"));
        }
        self.agreements.delete(&id.to_string())?;
        if let Err(e) = self.blobs.delete(&agreement.file.key) {
            warn!(agreement_id = %id, error = %e, "Agreement removed but its file could not be deleted");
        }
        info!(agreement_id = %id, "Agreement deleted");
        Ok(())
    }

    pub fn summary(&self, scope: Scope) -> Result<AgreementSummary, AgreementError> {
        let mut summary = AgreementSummary::default();
        for agreement in self.scoped(scope)? {
            summary.add(agreement.status);
        }
        Ok(summary)
    }

    fn scoped(&self, scope: Scope) -> Result<Vec<Agreement>, StoreError> {
        match scope {
            Scope::Client(id) => self.agreements.find_by_index("client", &id.to_string()),
            Scope::All => self.agreements.all(),
        }
    }

    /// Sign or reject on behalf of the addressed client.
    fn client_decision<F>(
        &self,
        actor: &Actor,
        id: AgreementId,
        next: AgreementStatus,
        apply: F,
    ) -> Result<Agreement, AgreementError>
    where
        F: FnOnce(&mut Agreement),
    {
        let now = self.clock.now();
        let _guard = self.write_lock.lock();
        let current = self.get(actor, id)?;
        if current.client_id != actor.user_id {
            return Err(AgreementError::Forbidden("only the addressed client may decide"));
        }
        self.agreements
            .update(&id.to_string(), |a: &mut Agreement| {
                a.status = a.status.transition(next)?;
                apply(a);
                a.updated_at = now;
                Ok::<(), AgreementError>(())
            })
            .map_err(|e| not_found_as(e, id))
    }
}
