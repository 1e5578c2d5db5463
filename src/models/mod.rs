//! Domain models for the auth core.

mod external_identity;
mod principal;

pub use external_identity::{ExternalProfile, IdentityBinding, IdentityProvider};
pub use principal::{GamificationState, Principal, PrincipalKind, Role};
