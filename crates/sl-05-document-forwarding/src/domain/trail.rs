//! Custody-chain checks applied before every document write.

use super::entities::{Document, DocumentStatus, TrailAction};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrailViolation {
    #[error("trail is empty")]
    Empty,

    #[error("entry 0 must be the upload by the uploader")]
    BadOrigin,

    #[error("entry {index} has seq {seq}")]
    Gap { index: usize, seq: u32 },

    #[error("entry {seq} starts from {found} but the holder was {expected}")]
    BrokenChain {
        seq: u32,
        expected: String,
        found: String,
    },

    #[error("current owner does not match the last forwarding")]
    OwnerMismatch,

    #[error("entry {seq} changes a closed document")]
    AfterTerminal { seq: u32 },

    #[error("document status does not match the last entry")]
    StatusMismatch,
}

/// Check that `doc.trail` is a well-formed custody chain ending at
/// `doc.current_owner` and `doc.status`.
pub fn verify(doc: &Document) -> Result<(), TrailViolation> {
    let first = doc.trail.first().ok_or(TrailViolation::Empty)?;
    if first.action != TrailAction::Uploaded
        || first.from != doc.uploaded_by
        || first.status != DocumentStatus::Pending
    {
        return Err(TrailViolation::BadOrigin);
    }

    let mut holder = doc.uploaded_by;
    let mut status = first.status;
    for (index, entry) in doc.trail.iter().enumerate() {
        if usize::try_from(entry.seq).ok() != Some(index) {
            return Err(TrailViolation::Gap {
                index,
                seq: entry.seq,
            });
        }
        if index == 0 {
            continue;
        }
        if entry.from != holder {
            return Err(TrailViolation::BrokenChain {
                seq: entry.seq,
                expected: holder.to_string(),
                found: entry.from.to_string(),
            });
        }
        if status.is_terminal() {
            return Err(TrailViolation::AfterTerminal { seq: entry.seq });
        }
        if entry.action == TrailAction::Forwarded {
            holder = entry.to.ok_or(TrailViolation::OwnerMismatch)?;
        }
        status = entry.status;
    }

    if holder != doc.current_owner {
        return Err(TrailViolation::OwnerMismatch);
    }
    if status != doc.status {
        return Err(TrailViolation::StatusMismatch);
    }
    Ok(())
}
