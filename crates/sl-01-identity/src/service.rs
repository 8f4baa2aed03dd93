//! # Identity Service
//!
//! Account lifecycle, login and token authentication.

use crate::domain::entities::{NewUser, Session, User, UserCounts, UserUpdate, UserView};
use crate::domain::errors::IdentityError;
use crate::domain::password;
use crate::domain::token::{IdentityConfig, TokenIssuer};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, PortalEvent};
use shared_types::{
    Actor, Cid, Directory, Member, Page, PageRequest, Role, TimeSource, UserId,
};
use sl_02_record_store::{Collection, KeyValueStore, Sequence, StoreError};
use std::sync::Arc;
use tracing::{info, warn};

pub struct IdentityService {
    users: Collection<User>,
    cids: Sequence,
    tokens: TokenIssuer,
    clock: Arc<dyn TimeSource>,
    events: Arc<dyn EventPublisher>,
    /// Serializes read-check-write sequences (email uniqueness, CID allocation).
    write_lock: Mutex<()>,
}

fn normalize_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(IdentityError::Invalid(format!("malformed email: {email}")));
    }
    Ok(email)
}

fn required(field: &str, value: &str) -> Result<String, IdentityError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(IdentityError::Invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn map_unique(err: StoreError, email: &str) -> IdentityError {
    match err {
        StoreError::UniqueViolation { index: "email", .. } => {
            IdentityError::EmailTaken(email.to_string())
        }
        other => other.into(),
    }
}

impl IdentityService {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        config: &IdentityConfig,
        clock: Arc<dyn TimeSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            users: Collection::new(kv.clone()),
            cids: Sequence::new(kv, "cid"),
            tokens: TokenIssuer::new(config),
            clock,
            events,
            write_lock: Mutex::new(()),
        }
    }

    // =========================================================================
    // ACCOUNT CREATION
    // =========================================================================

    /// Create the first admin if none exists yet. Returns `None` when an
    /// admin is already present.
    pub fn bootstrap_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<UserView>, IdentityError> {
        let _guard = self.write_lock.lock();
        if !self.users.find_by_index("role", Role::Admin.as_str())?.is_empty() {
            return Ok(None);
        }
        let user = self.insert_user(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Admin,
            phone: None,
            company: None,
        })?;
        info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");
        self.events.publish(PortalEvent::UserCreated {
            actor: user.id,
            user_id: user.id,
            role: user.role,
            cid: None,
        });
        Ok(Some(user.view()))
    }

    /// Admin-only account creation. Clients receive the next CID.
    pub fn create_user(&self, actor: &Actor, input: NewUser) -> Result<UserView, IdentityError> {
        if !actor.is_admin() {
            return Err(IdentityError::Forbidden("only admins create accounts"));
        }
        let user = {
            let _guard = self.write_lock.lock();
            self.insert_user(input)?
        };
        info!(
            actor = %actor.user_id,
            user_id = %user.id,
            role = %user.role,
            cid = ?user.cid,
            "User created"
        );
        self.events.publish(PortalEvent::UserCreated {
            actor: actor.user_id,
            user_id: user.id,
            role: user.role,
            cid: user.cid.clone(),
        });
        Ok(user.view())
    }

    /// Caller holds `write_lock`.
    fn insert_user(&self, input: NewUser) -> Result<User, IdentityError> {
        let name = required("name", &input.name)?;
        let email = normalize_email(&input.email)?;
        password::check_policy(&input.password)?;

        if self.users.find_unique("email", &email)?.is_some() {
            return Err(IdentityError::EmailTaken(email));
        }

        let password_hash = password::hash(&input.password)?;
        let cid = match input.role {
            Role::Client => Some(Cid::from_sequence(self.cids.next()?)),
            Role::Admin | Role::Staff => None,
        };
        let now = self.clock.now();
        let user = User {
            id: UserId::new(),
            name,
            email: email.clone(),
            phone: optional(input.phone),
            company: optional(input.company),
            role: input.role,
            cid,
            password_hash,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(&user).map_err(|e| map_unique(e, &email))?;
        Ok(user)
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    pub fn login(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let email = email.trim().to_ascii_lowercase();
        let user = self.users.find_unique("email", &email)?;
        let stored = user.as_ref().map(|u| u.password_hash.as_str());
        let verified = password::verify_login(password, stored);
        let Some(user) = user.filter(|_| verified) else {
            warn!(email = %email, "Login failed");
            return Err(IdentityError::InvalidCredentials);
        };
        if !user.active {
            warn!(user_id = %user.id, "Login refused for disabled account");
            return Err(IdentityError::AccountDisabled);
        }

        let (token, expires_at) =
            self.tokens.issue(user.id, user.role, user.cid.clone(), self.clock.now())?;
        info!(user_id = %user.id, role = %user.role, "Login succeeded");
        Ok(Session {
            token,
            expires_at,
            user: user.view(),
        })
    }

    /// Resolve a token to the current state of its user.
    pub fn authenticate(&self, token: &str) -> Result<Actor, IdentityError> {
        let claims = self.tokens.verify(token, self.clock.now())?;
        let user = self
            .users
            .get(&claims.sub.to_string())?
            .ok_or(IdentityError::InvalidToken)?;
        if !user.active {
            return Err(IdentityError::InvalidToken);
        }
        Ok(user.actor())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn get_user(&self, actor: &Actor, id: UserId) -> Result<UserView, IdentityError> {
        if !actor.is_reviewer() && actor.user_id != id {
            return Err(IdentityError::Forbidden("clients can only view themselves"));
        }
        Ok(self.load(id)?.view())
    }

    pub fn list_users(
        &self,
        actor: &Actor,
        role: Option<Role>,
        page: PageRequest,
    ) -> Result<Page<UserView>, IdentityError> {
        if !actor.is_reviewer() {
            return Err(IdentityError::Forbidden("clients cannot list accounts"));
        }
        let mut users = match role {
            Some(role) => self.users.find_by_index("role", role.as_str())?,
            None => self.users.all()?,
        };
        users.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(page.apply(users).map(|u| u.view()))
    }

    pub fn counts(&self) -> Result<UserCounts, IdentityError> {
        let mut counts = UserCounts::default();
        for user in self.users.all()? {
            match user.role {
                Role::Admin => counts.admins += 1,
                Role::Staff => counts.staff += 1,
                Role::Client => counts.clients += 1,
            }
            if user.active {
                counts.active += 1;
            } else {
                counts.inactive += 1;
            }
        }
        Ok(counts)
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Admins may change any field; everyone else only their own name,
    /// phone and company.
    pub fn update_user(
        &self,
        actor: &Actor,
        id: UserId,
        update: UserUpdate,
    ) -> Result<UserView, IdentityError> {
        let is_self = actor.user_id == id;
        if !actor.is_admin() {
            if !is_self {
                return Err(IdentityError::Forbidden("cannot modify another account"));
            }
            if update.touches_privileged_fields() {
                return Err(IdentityError::Forbidden(
                    "only admins change email, role or status",
                ));
            }
        }
        if is_self && actor.is_admin() {
            let demoted = update.role.is_some_and(|r| r != Role::Admin);
            if demoted || update.active == Some(false) {
                return Err(IdentityError::Forbidden(
                    "admins cannot demote or disable themselves",
                ));
            }
        }

        let name = update.name.as_deref().map(|n| required("name", n)).transpose()?;
        let email = update.email.as_deref().map(normalize_email).transpose()?;

        let _guard = self.write_lock.lock();
        let existing = self.load(id)?;
        let new_cid = match update.role {
            Some(Role::Client) if existing.cid.is_none() => {
                Some(Cid::from_sequence(self.cids.next()?))
            }
            _ => None,
        };
        let now = self.clock.now();
        let updated = self
            .users
            .update::<IdentityError, _>(&id.to_string(), |user| {
                if let Some(name) = name {
                    user.name = name;
                }
                if let Some(email) = email.clone() {
                    user.email = email;
                }
                if update.phone.is_some() {
                    user.phone = optional(update.phone);
                }
                if update.company.is_some() {
                    user.company = optional(update.company);
                }
                if let Some(role) = update.role {
                    user.role = role;
                }
                if let Some(cid) = new_cid {
                    user.cid = Some(cid);
                }
                if let Some(active) = update.active {
                    user.active = active;
                }
                user.updated_at = now;
                Ok(())
            })
            .map_err(|e| match e {
                IdentityError::Storage(inner) => {
                    map_unique(inner, email.as_deref().unwrap_or_default())
                }
                other => other,
            })?;

        info!(actor = %actor.user_id, user_id = %id, "User updated");
        Ok(updated.view())
    }

    pub fn change_password(
        &self,
        actor: &Actor,
        current: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let user = self.load(actor.user_id)?;
        if !password::verify(current, &user.password_hash) {
            return Err(IdentityError::InvalidCredentials);
        }
        self.store_password(actor.user_id, new_password)?;
        info!(user_id = %actor.user_id, "Password changed");
        Ok(())
    }

    pub fn reset_password(
        &self,
        actor: &Actor,
        id: UserId,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        if !actor.is_admin() {
            return Err(IdentityError::Forbidden("only admins reset passwords"));
        }
        self.store_password(id, new_password)?;
        info!(actor = %actor.user_id, user_id = %id, "Password reset");
        Ok(())
    }

    fn store_password(&self, id: UserId, new_password: &str) -> Result<(), IdentityError> {
        password::check_policy(new_password)?;
        let hash = password::hash(new_password)?;
        let now = self.clock.now();
        self.users
            .update::<IdentityError, _>(&id.to_string(), |user| {
                user.password_hash = hash;
                user.updated_at = now;
                Ok(())
            })
            .map_err(|e| not_found_as(e, id))?;
        Ok(())
    }

    pub fn delete_user(&self, actor: &Actor, id: UserId) -> Result<(), IdentityError> {
        if !actor.is_admin() {
            return Err(IdentityError::Forbidden("only admins delete accounts"));
        }
        if actor.user_id == id {
            return Err(IdentityError::Forbidden("admins cannot delete themselves"));
        }
        let _guard = self.write_lock.lock();
        match self.users.delete(&id.to_string())? {
            Some(user) => {
                info!(actor = %actor.user_id, user_id = %id, email = %user.email, "User deleted");
                Ok(())
            }
            None => Err(IdentityError::NotFound(id)),
        }
    }

    fn load(&self, id: UserId) -> Result<User, IdentityError> {
        self.users
            .get(&id.to_string())?
            .ok_or(IdentityError::NotFound(id))
    }
}

fn not_found_as(err: IdentityError, id: UserId) -> IdentityError {
    match err {
        IdentityError::Storage(StoreError::NotFound { .. }) => IdentityError::NotFound(id),
        other => other,
    }
}

impl Directory for IdentityService {
    fn member(&self, id: &UserId) -> Option<Member> {
        match self.users.get(&id.to_string()) {
            Ok(user) => user.map(|u| u.member()),
            Err(e) => {
                warn!(user_id = %id, error = %e, "Directory lookup failed");
                None
            }
        }
    }

    fn members_with_role(&self, role: Role) -> Vec<Member> {
        match self.users.find_by_index("role", role.as_str()) {
            Ok(users) => users.iter().map(User::member).collect(),
            Err(e) => {
                warn!(role = %role, error = %e, "Directory scan failed");
                Vec::new()
            }
        }
    }
}
