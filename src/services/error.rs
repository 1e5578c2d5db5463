use thiserror::Error;

use crate::store::StoreError;

/// Error taxonomy for the auth core.
///
/// The credential-verification variants are deliberately distinct: callers
/// react differently to `Expired` (refresh flow can prompt re-login) than to
/// `Malformed` or `SignatureInvalid` (drop the request). `Unauthenticated`
/// and `Forbidden` map to 401 and 403 at the transport layer.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Credential string cannot be parsed as a token.
    #[error("Malformed credential")]
    Malformed,

    /// Credential parsed but the signature does not match (tampered or
    /// signed with a different key).
    #[error("Credential signature invalid")]
    SignatureInvalid,

    /// Credential is structurally valid and correctly signed, but past its
    /// expiry.
    #[error("Credential expired")]
    Expired,

    /// Credential is valid and unexpired but was explicitly revoked.
    #[error("Credential revoked")]
    Revoked,

    /// Password login failed. Deliberately conflates unknown email with
    /// wrong password so the error never reveals whether an account exists.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Too many failed attempts; the account is time-locked.
    #[error("Account locked")]
    AccountLocked,

    /// The account exists but is deactivated.
    #[error("Account inactive")]
    AccountInactive,

    /// External identity profile lacks a verified email; no account is
    /// created or linked.
    #[error("Identity profile incomplete: {0}")]
    IdentityProfileIncomplete(String),

    /// The requested identity provider is not configured.
    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Authenticated but not permitted to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No credential, or a credential that cannot be trusted, on a
    /// protected call.
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Whether this error belongs to the 401 class (as opposed to 403).
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::Malformed
                | AuthError::SignatureInvalid
                | AuthError::Expired
                | AuthError::Revoked
                | AuthError::Unauthenticated
        )
    }
}
