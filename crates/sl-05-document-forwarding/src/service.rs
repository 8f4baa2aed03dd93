//! # Document Forwarding Service
//!
//! Every mutation runs under the write lock, re-verifies the custody trail
//! inside the record update, and publishes only after the write succeeded.

use crate::domain::entities::{
    Document, DocumentStatus, DocumentSummary, NewDocument, TrailAction, TrailEntry,
};
use crate::domain::errors::DfsError;
use crate::domain::trail;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, PortalEvent};
use shared_types::{
    Actor, Directory, DocumentId, FileRef, Page, PageRequest, Scope, TimeSource, UserId,
};
use sl_02_record_store::{
    read_verified, store_file, BlobStore, Collection, KeyValueStore, Upload,
};
use std::sync::Arc;
use tracing::{info, warn};

pub struct DocumentService {
    documents: Collection<Document>,
    blobs: Arc<dyn BlobStore>,
    directory: Arc<dyn Directory>,
    clock: Arc<dyn TimeSource>,
    events: Arc<dyn EventPublisher>,
    write_lock: Mutex<()>,
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn newest_first(mut docs: Vec<Document>) -> Vec<Document> {
    docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    docs
}

impl DocumentService {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        blobs: Arc<dyn BlobStore>,
        directory: Arc<dyn Directory>,
        clock: Arc<dyn TimeSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            documents: Collection::new(kv),
            blobs,
            directory,
            clock,
            events,
            write_lock: Mutex::new(()),
        }
    }

    // =========================================================================
    // CUSTODY
    // =========================================================================

    pub fn upload(
        &self,
        actor: &Actor,
        input: NewDocument,
        upload: &Upload,
    ) -> Result<Document, DfsError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(DfsError::Invalid("title is required".into()));
        }
        if upload.bytes.is_empty() {
            return Err(DfsError::Invalid("file is empty".into()));
        }

        let id = DocumentId::new();
        let file = store_file(self.blobs.as_ref(), &format!("documents/{id}"), upload)?;
        let now = self.clock.now();
        let doc = Document {
            id,
            title,
            description: optional(input.description),
            category: optional(input.category),
            file,
            uploaded_by: actor.user_id,
            current_owner: actor.user_id,
            status: DocumentStatus::Pending,
            trail: vec![TrailEntry {
                seq: 0,
                action: TrailAction::Uploaded,
                from: actor.user_id,
                to: None,
                by: actor.user_id,
                status: DocumentStatus::Pending,
                note: None,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        };
        trail::verify(&doc)?;
        if let Err(e) = self.documents.insert(&doc) {
            if let Err(cleanup) = self.blobs.delete(&doc.file.key) {
                warn!(document_id = %doc.id, error = %cleanup, "Orphaned upload left in blob store");
            }
            return Err(e.into());
        }

        info!(
            document_id = %doc.id,
            uploader = %actor.user_id,
            file = %doc.file.file_name,
            size = doc.file.size,
            "Document uploaded"
        );
        self.events.publish(PortalEvent::DocumentUploaded {
            actor: actor.user_id,
            document_id: doc.id,
            title: doc.title.clone(),
        });
        Ok(doc)
    }

    /// Hand the document to another staff member or admin. A pending
    /// document enters review on its first forwarding.
    pub fn forward(
        &self,
        actor: &Actor,
        id: DocumentId,
        to: UserId,
        note: Option<String>,
    ) -> Result<Document, DfsError> {
        let note = optional(note);
        let now = self.clock.now();

        let _guard = self.write_lock.lock();
        let current = self.get(actor, id)?;
        Self::ensure_custodian(actor, &current)?;
        if current.status.is_terminal() {
            return Err(DfsError::Closed(current.status));
        }
        self.check_recipient(&current, to)?;

        let doc = self.documents.update(&id.to_string(), |doc: &mut Document| {
            if doc.status == DocumentStatus::Pending {
                doc.status = doc.status.transition(DocumentStatus::InReview)?;
            }
            doc.push_entry(TrailAction::Forwarded, Some(to), actor.user_id, note, now);
            doc.current_owner = to;
            trail::verify(doc)?;
            Ok::<(), DfsError>(())
        })?;

        info!(
            document_id = %id,
            from = %current.current_owner,
            to = %to,
            by = %actor.user_id,
            "Document forwarded"
        );
        self.events.publish(PortalEvent::DocumentForwarded {
            actor: actor.user_id,
            document_id: id,
            title: doc.title.clone(),
            from: current.current_owner,
            to,
        });
        Ok(doc)
    }

    /// Move the document along its lifecycle without changing hands.
    pub fn set_status(
        &self,
        actor: &Actor,
        id: DocumentId,
        status: DocumentStatus,
        note: Option<String>,
    ) -> Result<Document, DfsError> {
        let note = optional(note);
        let now = self.clock.now();

        let _guard = self.write_lock.lock();
        let current = self.get(actor, id)?;
        Self::ensure_custodian(actor, &current)?;
        if current.status.is_terminal() {
            return Err(DfsError::Closed(current.status));
        }

        let doc = self.documents.update(&id.to_string(), |doc: &mut Document| {
            doc.status = doc.status.transition(status)?;
            doc.push_entry(TrailAction::StatusChanged, None, actor.user_id, note, now);
            trail::verify(doc)?;
            Ok::<(), DfsError>(())
        })?;

        info!(document_id = %id, status = %doc.status, by = %actor.user_id, "Document status changed");
        self.events.publish(PortalEvent::DocumentStatusChanged {
            actor: actor.user_id,
            document_id: id,
            title: doc.title.clone(),
            uploaded_by: doc.uploaded_by,
            status: doc.status.as_str().to_string(),
        });
        Ok(doc)
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn get(&self, actor: &Actor, id: DocumentId) -> Result<Document, DfsError> {
        match self.documents.get(&id.to_string())? {
            Some(doc) if doc.is_visible_to(actor) => Ok(doc),
            _ => Err(DfsError::NotFound(id)),
        }
    }

    pub fn trail(&self, actor: &Actor, id: DocumentId) -> Result<Vec<TrailEntry>, DfsError> {
        Ok(self.get(actor, id)?.trail)
    }

    /// Documents currently held by the caller.
    pub fn inbox(&self, actor: &Actor, page: PageRequest) -> Result<Page<Document>, DfsError> {
        let docs = self
            .documents
            .find_by_index("owner", &actor.user_id.to_string())?;
        Ok(page.apply(newest_first(docs)))
    }

    /// Documents the caller uploaded.
    pub fn uploaded(&self, actor: &Actor, page: PageRequest) -> Result<Page<Document>, DfsError> {
        let docs = self
            .documents
            .find_by_index("uploader", &actor.user_id.to_string())?;
        Ok(page.apply(newest_first(docs)))
    }

    /// Documents the caller appears in anywhere along the trail.
    pub fn involved(&self, actor: &Actor, page: PageRequest) -> Result<Page<Document>, DfsError> {
        let docs = self
            .documents
            .find_by_index("party", &actor.user_id.to_string())?;
        Ok(page.apply(newest_first(docs)))
    }

    /// Admin-wide listing.
    pub fn list_all(
        &self,
        actor: &Actor,
        status: Option<DocumentStatus>,
        page: PageRequest,
    ) -> Result<Page<Document>, DfsError> {
        if !actor.is_admin() {
            return Err(DfsError::Forbidden("only admins list every document"));
        }
        let docs = match status {
            Some(status) => self.documents.find_by_index("status", status.as_str())?,
            None => self.documents.all()?,
        };
        Ok(page.apply(newest_first(docs)))
    }

    /// The stored file, verified against the digest recorded at upload.
    pub fn download(
        &self,
        actor: &Actor,
        id: DocumentId,
    ) -> Result<(FileRef, Vec<u8>), DfsError> {
        let doc = self.get(actor, id)?;
        let bytes = read_verified(self.blobs.as_ref(), &doc.file)?;
        Ok((doc.file, bytes))
    }

    /// Uploaders may delete until the document first changes hands; admins
    /// may always delete.
    pub fn delete(&self, actor: &Actor, id: DocumentId) -> Result<(), DfsError> {
        let _guard = self.write_lock.lock();
        let doc = self.get(actor, id)?;
        if !actor.is_admin() {
            if doc.uploaded_by != actor.user_id {
                return Err(DfsError::Forbidden("only the uploader may delete a document"));
            }
            if doc.was_forwarded() {
                return Err(DfsError::Forbidden("forwarded documents can only be deleted by an admin"));
            }
        }
        self.documents.delete(&id.to_string())?;
        if let Err(e) = self.blobs.delete(&doc.file.key) {
            warn!(document_id = %id, error = %e, "Document removed but its file could not be deleted");
        }
        info!(document_id = %id, by = %actor.user_id, "Document deleted");
        Ok(())
    }

    /// `Scope::All` counts every document; a client scope counts the
    /// documents that user is involved in.
    pub fn summary(&self, scope: Scope) -> Result<DocumentSummary, DfsError> {
        let docs = match scope {
            Scope::All => self.documents.all()?,
            Scope::Client(user) => self.documents.find_by_index("party", &user.to_string())?,
        };
        let mut summary = DocumentSummary::default();
        docs.iter().for_each(|d| summary.add(d.status));
        Ok(summary)
    }

    /// Number of documents waiting on `user`.
    pub fn inbox_size(&self, user: &UserId) -> Result<usize, DfsError> {
        Ok(self
            .documents
            .find_by_index("owner", &user.to_string())?
            .iter()
            .filter(|d| !d.status.is_terminal())
            .count())
    }

    fn ensure_custodian(actor: &Actor, doc: &Document) -> Result<(), DfsError> {
        if doc.is_custodian(actor) {
            Ok(())
        } else {
            Err(DfsError::Forbidden("only the current holder may act on this document"))
        }
    }

    fn check_recipient(&self, doc: &Document, to: UserId) -> Result<(), DfsError> {
        let invalid = |reason| DfsError::InvalidRecipient { user: to, reason };
        let member = self.directory.member(&to).ok_or_else(|| invalid("no such user"))?;
        if !member.active {
            return Err(invalid("account is disabled"));
        }
        if !member.role.is_reviewer() {
            return Err(invalid("documents go to staff or admins only"));
        }
        if to == doc.current_owner {
            return Err(invalid("already holds the document"));
        }
        Ok(())
    }
}
