use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::{ExternalProfile, IdentityProvider, Principal, PrincipalKind, Role};
use crate::services::error::AuthError;
use crate::services::identity::ExternalIdentityLinker;
use crate::services::lockout::LockoutTracker;
use crate::services::permissions::{self, Requirement};
use crate::services::revocation::RevocationRegistry;
use crate::services::token::{
    AccessCredential, Audience, Claims, CredentialPair, TokenCodec, TokenUse,
};
use crate::store::PrincipalStore;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// The verified caller of a protected request, built from a trusted access
/// credential. Carries the authorization snapshot taken at issuance.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub role: Option<Role>,
    pub overrides: BTreeMap<String, bool>,
    pub audience: Audience,
    pub token_use: TokenUse,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Claims> for AuthenticatedPrincipal {
    fn from(claims: Claims) -> Self {
        // The audience string was validated during verification.
        let audience = claims.aud.parse().unwrap_or(Audience::Web);
        Self {
            id: claims.sub,
            kind: claims.kind,
            role: claims.role,
            overrides: claims.overrides,
            audience,
            token_use: claims.token_use,
            jti: claims.jti,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now),
        }
    }
}

/// Introspection summary for a credential. Never an error: an untrusted
/// token is simply inactive.
#[derive(Debug, Serialize)]
pub struct Introspection {
    pub active: bool,
    pub sub: Option<Uuid>,
    pub kind: Option<PrincipalKind>,
    pub role: Option<Role>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub jti: Option<String>,
}

impl Introspection {
    fn inactive() -> Self {
        Self {
            active: false,
            sub: None,
            kind: None,
            role: None,
            exp: None,
            iat: None,
            jti: None,
        }
    }
}

/// Orchestrates the four auth flows (password login, external-identity
/// login, refresh, logout) plus per-request verification and authorization.
pub struct AuthService {
    config: AuthConfig,
    store: Arc<dyn PrincipalStore>,
    codec: TokenCodec,
    revocations: Arc<dyn RevocationRegistry>,
    lockouts: LockoutTracker,
    linker: ExternalIdentityLinker,
    /// Burned on unknown-email logins so they cost the same as a wrong
    /// password and leave no timing oracle.
    dummy_hash: PasswordHashString,
}

impl AuthService {
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn PrincipalStore>,
        revocations: Arc<dyn RevocationRegistry>,
    ) -> Result<Self, AuthError> {
        let codec = TokenCodec::new(&config.token);
        let lockouts = LockoutTracker::new(&config.lockout);
        let linker = ExternalIdentityLinker::new(store.clone());

        let throwaway: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let dummy_hash = hash_password(&Password::new(throwaway))?;

        Ok(Self {
            config,
            store,
            codec,
            revocations,
            lockouts,
            linker,
            dummy_hash,
        })
    }

    pub fn lockouts(&self) -> &LockoutTracker {
        &self.lockouts
    }

    /// Password login: lock check, then verification, then issuance.
    ///
    /// Failures are opaque `InvalidCredentials` whether the email is unknown
    /// or the password wrong; a failed attempt increments the lockout
    /// counter before the error is returned.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        audience: Audience,
    ) -> Result<CredentialPair, AuthError> {
        let password = Password::new(password.to_string());

        let Some(principal) = self.store.find_by_email(email).await? else {
            let _ = verify_password(&password, &self.dummy_hash);
            return Err(AuthError::InvalidCredentials);
        };

        // Locked accounts never reach the hash check.
        if self.lockouts.is_locked(principal.id, Utc::now()) {
            return Err(AuthError::AccountLocked);
        }

        let verified = match &principal.password_hash {
            Some(hash) => verify_password(&password, &PasswordHashString::new(hash.clone())),
            None => {
                // Identity-only account: burn a verification anyway.
                let _ = verify_password(&password, &self.dummy_hash);
                false
            }
        };

        if !verified {
            let record = self.lockouts.record_failure(principal.id);
            tracing::info!(
                principal_id = %principal.id,
                failed_attempts = record.failed_attempts,
                "Failed password attempt"
            );
            return Err(AuthError::InvalidCredentials);
        }

        if !principal.is_active() {
            return Err(AuthError::AccountInactive);
        }

        self.lockouts.record_success(principal.id);
        let principal = self.stamp_last_login(principal).await?;

        let pair = self.codec.issue(&principal, audience)?;
        tracing::info!(principal_id = %principal.id, audience = audience.as_str(), "Login");
        Ok(pair)
    }

    /// External-identity login: provider availability, then resolution
    /// (match / link / create), then issuance.
    pub async fn login_with_identity(
        &self,
        provider: IdentityProvider,
        profile: &ExternalProfile,
        audience: Audience,
    ) -> Result<CredentialPair, AuthError> {
        if !self.config.is_provider_available(provider) {
            return Err(AuthError::ProviderUnavailable(provider.to_string()));
        }

        let principal = self.linker.resolve(provider, profile).await?;
        if !principal.is_active() {
            return Err(AuthError::AccountInactive);
        }

        let principal = self.stamp_last_login(principal).await?;
        let pair = self.codec.issue(&principal, audience)?;
        tracing::info!(
            principal_id = %principal.id,
            provider = %provider,
            "External identity login"
        );
        Ok(pair)
    }

    /// Redeem a refresh credential for a fresh access credential. The
    /// refresh credential is reused, not rotated. The principal is
    /// re-fetched so deactivation since issuance takes effect, and the new
    /// access credential carries the principal's current role and overrides.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessCredential, AuthError> {
        let claims = self.codec.verify(refresh_token, TokenUse::Refresh)?;

        if self.check_revoked_fail_closed(&claims.jti).await {
            return Err(AuthError::Revoked);
        }

        let principal = self
            .store
            .find_by_id(claims.sub)
            .await?
            .filter(Principal::is_active)
            .ok_or(AuthError::AccountInactive)?;

        let audience = claims.aud.parse().unwrap_or(Audience::Web);
        let access_token = self.codec.issue_access(&principal, audience)?;
        tracing::debug!(principal_id = %principal.id, "Access credential refreshed");

        Ok(AccessCredential {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.access_token_expiry_seconds(),
        })
    }

    /// Best-effort revocation of the presented credentials. Always succeeds
    /// from the caller's perspective: the client is discarding them either
    /// way, so bookkeeping failures are logged and swallowed.
    pub async fn logout(&self, access_token: &str, refresh_token: Option<&str>) {
        self.revoke_best_effort(access_token).await;
        if let Some(token) = refresh_token {
            self.revoke_best_effort(token).await;
        }
        tracing::info!("Logout");
    }

    async fn revoke_best_effort(&self, token: &str) {
        // Peek is enough here: revoking a jti we never issued is harmless,
        // and an undecodable token has no jti to revoke.
        let Some(claims) = TokenCodec::peek(token) else {
            return;
        };
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        if let Err(e) = self.revocations.revoke(&claims.jti, expires_at).await {
            tracing::warn!(error = %e, jti = %claims.jti, "Logout revocation bookkeeping failed");
        }
    }

    /// Authenticate a protected request. Every rejection reason (bad
    /// signature, expiry, revocation, registry failure) collapses into
    /// `Unauthenticated`; details go to the log, not the caller.
    pub async fn verify_request(&self, token: &str) -> Result<AuthenticatedPrincipal, AuthError> {
        let claims = self
            .codec
            .verify(token, TokenUse::Access)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access credential rejected");
                AuthError::Unauthenticated
            })?;

        if self.check_revoked_fail_closed(&claims.jti).await {
            return Err(AuthError::Unauthenticated);
        }

        Ok(AuthenticatedPrincipal::from(claims))
    }

    /// Authorize a verified principal against a requirement (403 class).
    pub fn authorize(
        &self,
        principal: &AuthenticatedPrincipal,
        requirement: &Requirement,
    ) -> Result<(), AuthError> {
        permissions::check(principal, requirement)
    }

    /// Credential introspection for UX surfaces. Mirrors `verify_request`
    /// but reports a summary instead of failing.
    pub async fn introspect(&self, token: &str) -> Introspection {
        let claims = match self.codec.verify(token, TokenUse::Access) {
            Ok(claims) => claims,
            Err(_) => return Introspection::inactive(),
        };

        if self.check_revoked_fail_closed(&claims.jti).await {
            return Introspection::inactive();
        }

        Introspection {
            active: true,
            sub: Some(claims.sub),
            kind: Some(claims.kind),
            role: claims.role,
            exp: Some(claims.exp),
            iat: Some(claims.iat),
            jti: Some(claims.jti),
        }
    }

    /// Opportunistic housekeeping: purge served lockouts and expired
    /// revocation entries.
    pub async fn purge_expired(&self, now: DateTime<Utc>) {
        self.lockouts.purge_expired(now);
        if let Err(e) = self.revocations.purge_expired(now).await {
            tracing::warn!(error = %e, "Revocation purge failed");
        }
    }

    /// Registry failures cannot confirm a credential is still good, so they
    /// deny: fail-closed for authorization, unlike logout bookkeeping.
    async fn check_revoked_fail_closed(&self, jti: &str) -> bool {
        match self.revocations.is_revoked(jti).await {
            Ok(revoked) => revoked,
            Err(e) => {
                tracing::error!(error = %e, "Revocation check failed; denying");
                true
            }
        }
    }

    async fn stamp_last_login(&self, mut principal: Principal) -> Result<Principal, AuthError> {
        principal.last_login = Some(Utc::now());
        Ok(self.store.update(principal).await?)
    }
}
