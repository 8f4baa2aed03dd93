//! Account entities.

use serde::{Deserialize, Serialize};
use shared_types::{Actor, Cid, Member, Role, Timestamp, UserId};
use sl_02_record_store::{IndexEntry, Record};

/// A stored portal account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Lowercased.
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Role,
    pub cid: Option<Cid>,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Record for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn indexes(&self) -> Vec<IndexEntry> {
        let mut indexes = vec![
            IndexEntry::unique("email", &self.email),
            IndexEntry::new("role", self.role.as_str()),
        ];
        if let Some(cid) = &self.cid {
            indexes.push(IndexEntry::unique("cid", cid.as_str()));
        }
        indexes
    }
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            role: self.role,
            cid: self.cid.clone(),
            name: self.name.clone(),
        }
    }

    pub fn member(&self) -> Member {
        Member {
            id: self.id,
            name: self.name.clone(),
            role: self.role,
            cid: self.cid.clone(),
            active: self.active,
        }
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: self.company.clone(),
            role: self.role,
            cid: self.cid.clone(),
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// What callers get to see of an account (never the hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Role,
    pub cid: Option<Cid>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for account creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// Partial account update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl UserUpdate {
    /// Fields only an admin may change.
    pub fn touches_privileged_fields(&self) -> bool {
        self.email.is_some() || self.role.is_some() || self.active.is_some()
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: Timestamp,
    pub user: UserView,
}

/// Account totals for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserCounts {
    pub admins: usize,
    pub staff: usize,
    pub clients: usize,
    pub active: usize,
    pub inactive: usize,
}
