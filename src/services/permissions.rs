//! Permission resolution: fixed role hierarchy plus per-principal overrides.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::models::Role;
use crate::services::auth::AuthenticatedPrincipal;
use crate::services::error::AuthError;

/// Wildcard granting every permission. Only `super_admin` resolves to it.
pub const WILDCARD: &str = "*";

const MEMBER_PERMISSIONS: &[&str] = &[
    "view_own_profile",
    "update_own_profile",
    "view_own_progress",
    "record_check_in",
];

const STAFF_PERMISSIONS: &[&str] = &["view_members", "manage_check_ins", "manage_schedules"];

const ADMIN_PERMISSIONS: &[&str] = &[
    "manage_clients",
    "manage_staff",
    "view_reports",
    "manage_memberships",
];

/// Default permission set for a role. Sets are cumulative down the
/// hierarchy; `super_admin` collapses to the wildcard.
pub fn role_defaults(role: Role) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    match role {
        Role::SuperAdmin => {
            set.insert(WILDCARD.to_string());
            return set;
        }
        Role::Admin => {
            for p in MEMBER_PERMISSIONS.iter().chain(STAFF_PERMISSIONS).chain(ADMIN_PERMISSIONS) {
                set.insert((*p).to_string());
            }
        }
        Role::Staff => {
            for p in MEMBER_PERMISSIONS.iter().chain(STAFF_PERMISSIONS) {
                set.insert((*p).to_string());
            }
        }
        Role::Member => {
            for p in MEMBER_PERMISSIONS {
                set.insert((*p).to_string());
            }
        }
    }
    set
}

/// Effective permissions: role defaults, plus explicit allows, minus
/// explicit denies. A `super_admin` always resolves to the wildcard; its
/// overrides are ignored (the wildcard cannot be revoked). Principals with
/// no role use the member default set.
pub fn effective_permissions(
    role: Option<Role>,
    overrides: &BTreeMap<String, bool>,
) -> BTreeSet<String> {
    let role = role.unwrap_or(Role::Member);
    if role == Role::SuperAdmin {
        return role_defaults(Role::SuperAdmin);
    }

    let mut set = role_defaults(role);
    for (name, allowed) in overrides {
        if *allowed {
            set.insert(name.clone());
        } else {
            set.remove(name);
        }
    }
    set
}

fn contains(set: &BTreeSet<String>, name: &str) -> bool {
    set.contains(WILDCARD) || set.contains(name)
}

/// An authorization requirement, checked against a verified principal.
#[derive(Debug, Clone)]
pub enum Requirement {
    /// Principal's role rank must be at least this role's rank.
    MinRole(Role),
    /// Named permission must be in the effective set.
    Permission(String),
    AnyPermission(Vec<String>),
    AllPermissions(Vec<String>),
    /// Resource must belong to the caller; admins and above always pass.
    Ownership(Uuid),
}

/// Authorize a verified principal against a requirement. Pure policy check:
/// no IO, no retries, terminal `Forbidden` on failure.
pub fn check(principal: &AuthenticatedPrincipal, requirement: &Requirement) -> Result<(), AuthError> {
    let role = principal.role.unwrap_or(Role::Member);

    match requirement {
        Requirement::MinRole(min) => {
            if role.rank() >= min.rank() {
                Ok(())
            } else {
                Err(AuthError::Forbidden(format!(
                    "requires role '{}' or higher",
                    min.as_str()
                )))
            }
        }
        Requirement::Permission(name) => {
            let set = effective_permissions(principal.role, &principal.overrides);
            if contains(&set, name) {
                Ok(())
            } else {
                Err(AuthError::Forbidden(format!(
                    "missing permission '{}'",
                    name
                )))
            }
        }
        Requirement::AnyPermission(names) => {
            let set = effective_permissions(principal.role, &principal.overrides);
            if names.iter().any(|n| contains(&set, n)) {
                Ok(())
            } else {
                Err(AuthError::Forbidden(format!(
                    "missing all of permissions {:?}",
                    names
                )))
            }
        }
        Requirement::AllPermissions(names) => {
            let set = effective_permissions(principal.role, &principal.overrides);
            match names.iter().find(|n| !contains(&set, n)) {
                None => Ok(()),
                Some(missing) => Err(AuthError::Forbidden(format!(
                    "missing permission '{}'",
                    missing
                ))),
            }
        }
        Requirement::Ownership(resource_id) => {
            if *resource_id == principal.id || role.rank() >= Role::Admin.rank() {
                Ok(())
            } else {
                Err(AuthError::Forbidden("not the resource owner".to_string()))
            }
        }
    }
}
