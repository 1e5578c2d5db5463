//! PrincipalStore - the persistence boundary.
//!
//! Principal records are owned by the wider backend; this crate consumes
//! them through the [`PrincipalStore`] trait. [`MemoryPrincipalStore`] is the
//! in-process implementation used by tests and single-node deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{IdentityProvider, Principal, PrincipalKind};

#[derive(Error, Debug)]
pub enum StoreError {
    /// Uniqueness conflict on (kind, email). The identity linker retries its
    /// lookup once on this, which resolves the find-or-create race between
    /// two near-simultaneous external logins.
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Principal not found")]
    NotFound,

    #[error("Store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Persistence operations the auth core needs. All by value; `create` and
/// `update` return the stored record.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, StoreError>;

    /// Case-insensitive email lookup. Uniqueness is per kind, so the same
    /// email may belong to both an admin-like and a member-like principal;
    /// implementations must then return the admin-like record.
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError>;

    async fn find_by_external_id(
        &self,
        provider: IdentityProvider,
        external_id: &str,
    ) -> Result<Option<Principal>, StoreError>;

    /// Atomic create-unique-by-email: fails with [`StoreError::DuplicateEmail`]
    /// when a principal of the same kind already holds the email.
    async fn create(&self, principal: Principal) -> Result<Principal, StoreError>;

    async fn update(&self, principal: Principal) -> Result<Principal, StoreError>;
}

/// Mutex-guarded in-memory store. Email keys are normalized to lowercase on
/// every insert and lookup.
#[derive(Default)]
pub struct MemoryPrincipalStore {
    principals: Mutex<HashMap<Uuid, Principal>>,
}

impl MemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Principal>>, StoreError> {
        self.principals
            .lock()
            .map_err(|e| StoreError::Backend(anyhow::anyhow!("Store mutex poisoned: {}", e)))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        let needle = normalize_email(email);
        Ok(self
            .lock()?
            .values()
            .filter(|p| p.email == needle)
            .min_by_key(|p| match p.kind {
                PrincipalKind::AdminLike => 0,
                PrincipalKind::MemberLike => 1,
            })
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        provider: IdentityProvider,
        external_id: &str,
    ) -> Result<Option<Principal>, StoreError> {
        Ok(self
            .lock()?
            .values()
            .find(|p| {
                p.bindings
                    .iter()
                    .any(|b| b.provider == provider && b.external_id == external_id)
            })
            .cloned())
    }

    async fn create(&self, mut principal: Principal) -> Result<Principal, StoreError> {
        principal.email = normalize_email(&principal.email);
        let mut map = self.lock()?;

        let duplicate = map
            .values()
            .any(|p| p.kind == principal.kind && p.email == principal.email);
        if duplicate {
            return Err(StoreError::DuplicateEmail);
        }

        map.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn update(&self, mut principal: Principal) -> Result<Principal, StoreError> {
        principal.email = normalize_email(&principal.email);
        let mut map = self.lock()?;

        if !map.contains_key(&principal.id) {
            return Err(StoreError::NotFound);
        }

        map.insert(principal.id, principal.clone());
        Ok(principal)
    }
}
