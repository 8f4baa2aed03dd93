//! # Notification Service

use crate::domain::entities::{Notification, NotificationKind};
use crate::domain::errors::NotificationError;
use shared_types::{
    Actor, Directory, NotificationId, Page, PageRequest, Role, TimeSource, UserId,
};
use sl_02_record_store::{Collection, KeyValueStore, StoreError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub struct NotificationService {
    notifications: Collection<Notification>,
    directory: Arc<dyn Directory>,
    clock: Arc<dyn TimeSource>,
    delivered: AtomicU64,
}

impl NotificationService {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        directory: Arc<dyn Directory>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            notifications: Collection::new(kv),
            directory,
            clock,
            delivered: AtomicU64::new(0),
        }
    }

    /// Drop a notification into `recipient`'s inbox.
    pub fn notify(
        &self,
        recipient: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        link: Option<String>,
    ) -> Result<Notification, NotificationError> {
        let notification = Notification {
            id: NotificationId::new(),
            recipient,
            kind,
            title: title.into(),
            message: message.into(),
            link,
            read: false,
            created_at: self.clock.now(),
        };
        self.notifications.insert(&notification)?;
        self.delivered.fetch_add(1, Ordering::Relaxed);
        debug!(recipient = %recipient, kind = ?kind, "Notification delivered");
        Ok(notification)
    }

    /// Admin announcement to every active member of `role`, or to everyone
    /// when no role is given. Returns the number of inboxes reached.
    pub fn broadcast(
        &self,
        actor: &Actor,
        role: Option<Role>,
        title: &str,
        message: &str,
    ) -> Result<usize, NotificationError> {
        if !actor.is_admin() {
            return Err(NotificationError::Forbidden("only admins broadcast"));
        }
        let (title, message) = (title.trim(), message.trim());
        if title.is_empty() || message.is_empty() {
            return Err(NotificationError::Invalid("title and message are required".into()));
        }

        let roles = match role {
            Some(role) => vec![role],
            None => vec![Role::Admin, Role::Staff, Role::Client],
        };
        let mut reached = 0;
        for member in roles
            .into_iter()
            .flat_map(|r| self.directory.members_with_role(r))
            .filter(|m| m.active && m.id != actor.user_id)
        {
            self.notify(member.id, NotificationKind::Announcement, title, message, None)?;
            reached += 1;
        }
        info!(actor = %actor.user_id, role = ?role, reached, "Broadcast sent");
        Ok(reached)
    }

    /// The caller's inbox, newest first.
    pub fn list(
        &self,
        actor: &Actor,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<Page<Notification>, NotificationError> {
        let index = if unread_only { "unread" } else { "recipient" };
        let mut items = self
            .notifications
            .find_by_index(index, &actor.user_id.to_string())?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(items))
    }

    pub fn unread_count(&self, actor: &Actor) -> Result<usize, NotificationError> {
        Ok(self
            .notifications
            .find_by_index("unread", &actor.user_id.to_string())?
            .len())
    }

    pub fn mark_read(
        &self,
        actor: &Actor,
        id: NotificationId,
    ) -> Result<Notification, NotificationError> {
        self.own(actor, id)?;
        self.notifications
            .update(&id.to_string(), |n: &mut Notification| {
                n.read = true;
                Ok::<(), NotificationError>(())
            })
            .map_err(|e| match e {
                NotificationError::Storage(StoreError::NotFound { .. }) => {
                    NotificationError::NotFound(id)
                }
                other => other,
            })
    }

    /// Returns how many notifications changed.
    pub fn mark_all_read(&self, actor: &Actor) -> Result<usize, NotificationError> {
        let unread = self
            .notifications
            .find_by_index("unread", &actor.user_id.to_string())?;
        for n in &unread {
            self.notifications
                .update(&n.id.to_string(), |n: &mut Notification| {
                    n.read = true;
                    Ok::<(), StoreError>(())
                })?;
        }
        Ok(unread.len())
    }

    pub fn delete(&self, actor: &Actor, id: NotificationId) -> Result<(), NotificationError> {
        self.own(actor, id)?;
        self.notifications.delete(&id.to_string())?;
        Ok(())
    }

    /// Notifications written since start-up.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Other users' notifications are reported as missing.
    fn own(&self, actor: &Actor, id: NotificationId) -> Result<Notification, NotificationError> {
        match self.notifications.get(&id.to_string())? {
            Some(n) if n.recipient == actor.user_id => Ok(n),
            _ => Err(NotificationError::NotFound(id)),
        }
    }
}
