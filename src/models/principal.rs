//! Principal model - local accounts (admin-like staff and member-like gym members).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::external_identity::{IdentityBinding, IdentityProvider};

/// Kind of a principal, carried explicitly on the record and inside
/// credential payloads. Authorization never infers the kind from anything
/// else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    AdminLike,
    MemberLike,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::AdminLike => "admin_like",
            PrincipalKind::MemberLike => "member_like",
        }
    }
}

/// Staff roles, ordered strictly: `SuperAdmin > Admin > Staff > Member`.
///
/// `Member` never appears on a principal record (member-like principals
/// carry `role: None`); it exists so the permission resolver has a rank for
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Staff,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Member => "member",
        }
    }

    /// Numeric rank for hierarchy comparisons; higher outranks lower.
    pub fn rank(&self) -> u8 {
        match self {
            Role::SuperAdmin => 3,
            Role::Admin => 2,
            Role::Staff => 1,
            Role::Member => 0,
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "member" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Gamification counters carried on member-like principals. Kept here only
/// as an example of a protected resource; the rest of the membership data
/// lives outside this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamificationState {
    pub points: i64,
    pub level: i32,
    pub last_check_in: Option<DateTime<Utc>>,
}

/// A local account.
///
/// # Invariants
/// - `email` is unique across all principals of a kind, compared
///   case-insensitively (the store normalizes to lowercase).
/// - At most one identity binding per provider.
/// - `role: None` means member-like; permission resolution falls back to the
///   member default set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub email: String,
    pub email_verified: bool,
    /// None for identity-only accounts (social login, no password set).
    pub password_hash: Option<String>,
    pub bindings: Vec<IdentityBinding>,
    pub role: Option<Role>,
    /// Explicit per-principal allow (`true`) / deny (`false`) adjustments to
    /// the role-default permission set.
    #[serde(default)]
    pub overrides: BTreeMap<String, bool>,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub gamification: GamificationState,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    /// Create a member-like principal with password auth.
    pub fn new_member(email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: PrincipalKind::MemberLike,
            email,
            email_verified: false,
            password_hash: Some(password_hash),
            bindings: Vec::new(),
            role: None,
            overrides: BTreeMap::new(),
            active: true,
            last_login: None,
            gamification: GamificationState::default(),
            created_at: Utc::now(),
        }
    }

    /// Create a member-like principal from an external identity. Social
    /// sign-ups arrive with a provider-verified email and no password.
    pub fn new_member_from_identity(email: String, binding: IdentityBinding) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: PrincipalKind::MemberLike,
            email,
            email_verified: true,
            password_hash: None,
            bindings: vec![binding],
            role: None,
            overrides: BTreeMap::new(),
            active: true,
            last_login: None,
            gamification: GamificationState::default(),
            created_at: Utc::now(),
        }
    }

    /// Create an admin-like principal with the given staff role.
    pub fn new_staff(email: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: PrincipalKind::AdminLike,
            email,
            email_verified: false,
            password_hash: Some(password_hash),
            bindings: Vec::new(),
            role: Some(role),
            overrides: BTreeMap::new(),
            active: true,
            last_login: None,
            gamification: GamificationState::default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Binding lookup by provider. The per-provider uniqueness invariant
    /// makes the first match the only match.
    pub fn binding_for(&self, provider: IdentityProvider) -> Option<&IdentityBinding> {
        self.bindings.iter().find(|b| b.provider == provider)
    }

    /// True once more than one provider is bound to this account.
    pub fn is_multi_provider(&self) -> bool {
        self.bindings.len() > 1
    }
}
