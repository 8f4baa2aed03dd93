use super::errors::AgreementError;
use serde::{Deserialize, Serialize};
use shared_types::{AgreementId, Cid, FileRef, Timestamp, UserId};
use sl_02_record_store::{IndexEntry, Record};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Sent,
    Viewed,
    Signed,
    Rejected,
    Withdrawn,
}

impl AgreementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgreementStatus::Sent => "sent",
            AgreementStatus::Viewed => "viewed",
            AgreementStatus::Signed => "signed",
            AgreementStatus::Rejected => "rejected",
            AgreementStatus::Withdrawn => "withdrawn",
        }
    }

    /// Still waiting on the client.
    pub fn is_open(self) -> bool {
        matches!(self, AgreementStatus::Sent | AgreementStatus::Viewed)
    }

    pub fn can_transition_to(self, next: AgreementStatus) -> bool {
        use AgreementStatus::*;
        matches!(
            (self, next),
            (Sent, Viewed) | (Sent | Viewed, Signed | Rejected | Withdrawn)
        )
    }

    pub fn transition(self, next: AgreementStatus) -> Result<AgreementStatus, AgreementError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AgreementError::InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed-name acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signer_name: String,
    pub signed_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: AgreementId,
    pub client_id: UserId,
    pub cid: Option<Cid>,
    pub title: String,
    pub description: Option<String>,
    pub file: FileRef,
    pub status: AgreementStatus,
    pub issued_by: UserId,
    pub viewed_at: Option<Timestamp>,
    pub signed_at: Option<Timestamp>,
    pub signature: Option<Signature>,
    pub rejection_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Record for Agreement {
    const COLLECTION: &'static str = "agreements";

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn indexes(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::new("client", self.client_id.to_string()),
            IndexEntry::new("issuer", self.issued_by.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAgreement {
    pub client_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgreementFilter {
    pub status: Option<AgreementStatus>,
    pub cid: Option<Cid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgreementSummary {
    pub total: usize,
    pub sent: usize,
    pub viewed: usize,
    pub signed: usize,
    pub rejected: usize,
    pub withdrawn: usize,
}

impl AgreementSummary {
    pub fn add(&mut self, status: AgreementStatus) {
        self.total += 1;
        let slot = match status {
            AgreementStatus::Sent => &mut self.sent,
            AgreementStatus::Viewed => &mut self.viewed,
            AgreementStatus::Signed => &mut self.signed,
            AgreementStatus::Rejected => &mut self.rejected,
            AgreementStatus::Withdrawn => &mut self.withdrawn,
        };
        *slot += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AgreementStatus::*;

    #[test]
    fn test_lifecycle_edges() {
        assert!(Sent.can_transition_to(Viewed));
        assert!(Sent.can_transition_to(Signed));
        assert!(Viewed.can_transition_to(Rejected));
        assert!(Viewed.can_transition_to(Withdrawn));
        assert!(!Viewed.can_transition_to(Sent));
        assert!(!Viewed.can_transition_to(Viewed));

        for closed in [Signed, Rejected, Withdrawn] {
            assert!(!closed.is_open());
            assert_eq!(
                closed.transition(Withdrawn),
                Err(AgreementError::InvalidTransition { from: closed, to: Withdrawn })
            );
        }
    }
}
