use serde::{Deserialize, Serialize};
use shared_types::{NotificationId, Timestamp, UserId};
use sl_02_record_store::{IndexEntry, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Bill,
    Payment,
    Document,
    Agreement,
    Announcement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Portal path the notification points at, e.g. `/bills/<id>`.
    pub link: Option<String>,
    pub read: bool,
    pub created_at: Timestamp,
}

impl Record for Notification {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn indexes(&self) -> Vec<IndexEntry> {
        let recipient = self.recipient.to_string();
        let mut indexes = vec![IndexEntry::new("recipient", recipient.clone())];
        if !self.read {
            indexes.push(IndexEntry::new("unread", recipient));
        }
        indexes
    }
}
