use super::errors::DfsError;
use serde::{Deserialize, Serialize};
use shared_types::{Actor, DocumentId, FileRef, Timestamp, UserId};
use sl_02_record_store::{IndexEntry, Record};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 4] = [
        DocumentStatus::Pending,
        DocumentStatus::InReview,
        DocumentStatus::Approved,
        DocumentStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::InReview => "in_review",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Approved | DocumentStatus::Rejected)
    }

    /// `pending → in_review → approved | rejected`, or a direct decision
    /// from `pending`.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Pending, InReview) | (Pending | InReview, Approved | Rejected)
        )
    }

    pub fn transition(self, next: DocumentStatus) -> Result<DocumentStatus, DfsError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DfsError::InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TRAIL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailAction {
    Uploaded,
    Forwarded,
    StatusChanged,
}

/// One step in a document's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailEntry {
    /// Position in the trail, contiguous from 0.
    pub seq: u32,
    pub action: TrailAction,
    /// Custodian before this step.
    pub from: UserId,
    /// New custodian; set only on `forwarded`.
    pub to: Option<UserId>,
    /// Who performed the step. Differs from `from` when an admin acts on a
    /// document held by someone else.
    pub by: UserId,
    /// Document status after this step.
    pub status: DocumentStatus,
    pub note: Option<String>,
    pub at: Timestamp,
}

// =============================================================================
// DOCUMENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub file: FileRef,
    pub uploaded_by: UserId,
    pub current_owner: UserId,
    pub status: DocumentStatus,
    pub trail: Vec<TrailEntry>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Document {
    /// Everyone the document has passed through, uploader first.
    pub fn parties(&self) -> BTreeSet<UserId> {
        let mut parties = BTreeSet::from([self.uploaded_by, self.current_owner]);
        for entry in &self.trail {
            parties.insert(entry.from);
            parties.extend(entry.to);
        }
        parties
    }

    pub fn involves(&self, user: &UserId) -> bool {
        self.uploaded_by == *user
            || self.current_owner == *user
            || self
                .trail
                .iter()
                .any(|e| e.from == *user || e.to.as_ref() == Some(user))
    }

    /// Admins read everything; everyone else only what they took part in.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.is_admin() || self.involves(&actor.user_id)
    }

    /// Current owner or an admin.
    pub fn is_custodian(&self, actor: &Actor) -> bool {
        actor.is_admin() || self.current_owner == actor.user_id
    }

    pub fn was_forwarded(&self) -> bool {
        self.trail.iter().any(|e| e.action == TrailAction::Forwarded)
    }

    pub(crate) fn push_entry(
        &mut self,
        action: TrailAction,
        to: Option<UserId>,
        by: UserId,
        note: Option<String>,
        at: Timestamp,
    ) {
        let seq = u32::try_from(self.trail.len()).unwrap_or(u32::MAX);
        self.trail.push(TrailEntry {
            seq,
            action,
            from: self.current_owner,
            to,
            by,
            status: self.status,
            note,
            at,
        });
        self.updated_at = at;
    }
}

impl Record for Document {
    const COLLECTION: &'static str = "documents";

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn indexes(&self) -> Vec<IndexEntry> {
        let mut indexes = vec![
            IndexEntry::new("owner", self.current_owner.to_string()),
            IndexEntry::new("uploader", self.uploaded_by.to_string()),
            IndexEntry::new("status", self.status.as_str()),
        ];
        indexes.extend(
            self.parties()
                .into_iter()
                .map(|p| IndexEntry::new("party", p.to_string())),
        );
        indexes
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Document counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub total: usize,
    pub pending: usize,
    pub in_review: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl DocumentSummary {
    pub fn add(&mut self, status: DocumentStatus) {
        self.total += 1;
        match status {
            DocumentStatus::Pending => self.pending += 1,
            DocumentStatus::InReview => self.in_review += 1,
            DocumentStatus::Approved => self.approved += 1,
            DocumentStatus::Rejected => self.rejected += 1,
        }
    }
}
