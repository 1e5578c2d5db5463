use std::sync::Arc;

use chrono::Utc;

use crate::models::{ExternalProfile, IdentityBinding, IdentityProvider, Principal};
use crate::services::error::AuthError;
use crate::store::{PrincipalStore, StoreError};

/// Resolves an external (OAuth-style) profile to a local principal:
/// match by external id, else match by email and link, else create.
pub struct ExternalIdentityLinker {
    store: Arc<dyn PrincipalStore>,
}

impl ExternalIdentityLinker {
    pub fn new(store: Arc<dyn PrincipalStore>) -> Self {
        Self { store }
    }

    /// Idempotent: the same (provider, external id) always resolves to the
    /// same principal.
    ///
    /// A profile without a provider-verified email fails with
    /// `IdentityProfileIncomplete` before anything is created or linked.
    pub async fn resolve(
        &self,
        provider: IdentityProvider,
        profile: &ExternalProfile,
    ) -> Result<Principal, AuthError> {
        let email = profile.usable_email().ok_or_else(|| {
            AuthError::IdentityProfileIncomplete(format!(
                "{} profile has no verified email",
                provider
            ))
        })?;

        if let Some(principal) = self
            .store
            .find_by_external_id(provider, &profile.id)
            .await?
        {
            return Ok(principal);
        }

        match self.link_or_create(provider, profile, email).await {
            Err(AuthError::Store(StoreError::DuplicateEmail)) => {
                // Lost a find-or-create race against a concurrent login with
                // the same email; the other request's principal now exists,
                // so a single retry must land on the link path.
                tracing::warn!(
                    provider = %provider,
                    "Create raced a concurrent identity login; retrying as link"
                );
                self.link_or_create(provider, profile, email).await
            }
            other => other,
        }
    }

    async fn link_or_create(
        &self,
        provider: IdentityProvider,
        profile: &ExternalProfile,
        email: &str,
    ) -> Result<Principal, AuthError> {
        if let Some(mut principal) = self.store.find_by_email(email).await? {
            // Account linking: the provider vouched for this email, so the
            // profile belongs to the existing local account.
            match principal
                .bindings
                .iter_mut()
                .find(|b| b.provider == provider)
            {
                Some(binding) => {
                    // Same provider, new subject id (e.g. the upstream
                    // account was recreated). Re-link rather than violate
                    // the one-binding-per-provider invariant.
                    tracing::warn!(
                        principal_id = %principal.id,
                        provider = %provider,
                        "Replacing stale external binding"
                    );
                    binding.external_id = profile.id.clone();
                    binding.linked_at = Utc::now();
                }
                None => {
                    principal
                        .bindings
                        .push(IdentityBinding::new(provider, profile.id.clone()));
                    if principal.is_multi_provider() {
                        tracing::info!(
                            principal_id = %principal.id,
                            provider = %provider,
                            "Principal is now multi-provider"
                        );
                    }
                }
            }
            principal.email_verified = true;

            let updated = self.store.update(principal).await?;
            tracing::info!(
                principal_id = %updated.id,
                provider = %provider,
                "Linked external identity to existing principal"
            );
            return Ok(updated);
        }

        let binding = IdentityBinding::new(provider, profile.id.clone());
        let created = self
            .store
            .create(Principal::new_member_from_identity(
                email.to_string(),
                binding,
            ))
            .await?;
        tracing::info!(
            principal_id = %created.id,
            provider = %provider,
            "Created principal from external identity"
        );
        Ok(created)
    }
}
