//! # Member Directory Port
//!
//! Read-only view of portal accounts for subsystems that must validate or
//! address other users (document recipients, notification fan-out) without
//! depending on the identity crate.
//!
//! Production: `IdentityService` (sl-01-identity)
//! Testing: `StaticDirectory` (below)

use crate::entities::{Cid, Role, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Public facts about an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub cid: Option<Cid>,
    pub active: bool,
}

/// Abstract lookup of portal members.
pub trait Directory: Send + Sync {
    /// Look a member up by id.
    fn member(&self, id: &UserId) -> Option<Member>;

    /// Every member with the given role, active or not.
    fn members_with_role(&self, role: Role) -> Vec<Member>;
}

/// In-memory directory for tests and tooling.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    members: RwLock<HashMap<UserId, Member>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, member: Member) {
        self.members.write().insert(member.id, member);
    }

    pub fn deactivate(&self, id: &UserId) {
        if let Some(m) = self.members.write().get_mut(id) {
            m.active = false;
        }
    }
}

impl Directory for StaticDirectory {
    fn member(&self, id: &UserId) -> Option<Member> {
        self.members.read().get(id).cloned()
    }

    fn members_with_role(&self, role: Role) -> Vec<Member> {
        let mut members: Vec<_> = self
            .members
            .read()
            .values()
            .filter(|m| m.role == role)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_directory_lookup() {
        let dir = StaticDirectory::new();
        let id = UserId::new();
        dir.insert(Member {
            id,
            name: "Asha".into(),
            role: Role::Staff,
            cid: None,
            active: true,
        });

        assert_eq!(dir.member(&id).map(|m| m.role), Some(Role::Staff));
        assert_eq!(dir.members_with_role(Role::Staff).len(), 1);
        assert!(dir.members_with_role(Role::Admin).is_empty());

        dir.deactivate(&id);
        assert_eq!(dir.member(&id).map(|m| m.active), Some(false));
    }
}
