//! # Core Domain Entities
//!
//! Identifiers, roles and value objects used by every subsystem.
//!
//! ## Clusters
//!
//! - **Identity**: `UserId`, `Cid`, `Role`, `Actor`, `Scope`
//! - **Records**: `BillId`, `PaymentId`, `DocumentId`, `AgreementId`, `NotificationId`
//! - **Money**: `Amount`, `Totals`
//! - **Review**: `Decision`
//! - **Files**: `FileRef`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// CLUSTER A: IDENTIFIERS
// =============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a portal account.
    UserId
);
define_id!(
    /// Identifier of a client bill.
    BillId
);
define_id!(
    /// Identifier of a payment request.
    PaymentId
);
define_id!(
    /// Identifier of a forwarded document.
    DocumentId
);
define_id!(
    /// Identifier of a client agreement.
    AgreementId
);
define_id!(
    /// Identifier of an inbox notification.
    NotificationId
);

/// Client identifier assigned to client accounts (`CID0001`, `CID0002`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    /// Prefix shared by every client identifier.
    pub const PREFIX: &'static str = "CID";

    /// Build the CID for the n-th client (1-based).
    #[must_use]
    pub fn from_sequence(n: u64) -> Self {
        Self(format!("{}{:04}", Self::PREFIX, n))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| format!("CID must start with {}", Self::PREFIX))?;
        if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("malformed CID: {s}"));
        }
        Ok(Self(s.to_string()))
    }
}

// =============================================================================
// CLUSTER B: ROLES AND PRINCIPALS
// =============================================================================

/// Account role. Determines which records and operations are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Client,
}

impl Role {
    /// Staff and admins review bills, payments and documents.
    #[must_use]
    pub fn is_reviewer(self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "client" => Ok(Role::Client),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated principal behind a request.
///
/// Resolved by the gateway from a verified token. Domain services take an
/// `&Actor` instead of trusting ids found in request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub cid: Option<Cid>,
    pub name: String,
}

impl Actor {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[must_use]
    pub fn is_reviewer(&self) -> bool {
        self.role.is_reviewer()
    }

    #[must_use]
    pub fn is_client(&self) -> bool {
        self.role == Role::Client
    }

    /// The slice of tenant data this actor may read.
    #[must_use]
    pub fn scope(&self) -> Scope {
        if self.is_reviewer() {
            Scope::All
        } else {
            Scope::Client(self.user_id)
        }
    }
}

/// Which tenant's records an aggregate or listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every tenant (staff and admins).
    All,
    /// Only records owned by this client account.
    Client(UserId),
}

impl Scope {
    #[must_use]
    pub fn includes(&self, owner: &UserId) -> bool {
        match self {
            Scope::All => true,
            Scope::Client(id) => id == owner,
        }
    }
}

// =============================================================================
// CLUSTER C: MONEY
// =============================================================================

/// Non-negative amount of money in minor units (paise / cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(pub u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    #[must_use]
    pub fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    #[must_use]
    pub fn minor(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Saturating addition, used when summing dashboards.
    #[must_use]
    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Amount::saturating_add)
    }
}

/// Number of records and their summed amount, for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub count: usize,
    pub amount: Amount,
}

impl Totals {
    pub fn add(&mut self, amount: Amount) {
        self.count += 1;
        self.amount = self.amount.saturating_add(amount);
    }
}

/// A reviewer's verdict on a pending bill, payment request or document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    #[must_use]
    pub fn is_approve(self) -> bool {
        self == Decision::Approve
    }
}

// =============================================================================
// CLUSTER D: FILES
// =============================================================================

/// Pointer to a file held by the blob store, plus the metadata needed to
/// serve and verify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Blob store key.
    pub key: String,
    /// Original file name as uploaded.
    pub file_name: String,
    /// MIME type reported by the uploader.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Hex-encoded SHA-256 of the content.
    pub sha256: String,
}
