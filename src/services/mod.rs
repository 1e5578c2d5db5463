pub mod auth;
pub mod error;
pub mod identity;
pub mod lockout;
pub mod permissions;
pub mod revocation;
pub mod token;

pub use auth::{AuthService, AuthenticatedPrincipal, Introspection};
pub use error::AuthError;
pub use identity::ExternalIdentityLinker;
pub use lockout::{LockoutRecord, LockoutTracker};
pub use permissions::{effective_permissions, role_defaults, Requirement};
pub use revocation::{spawn_purge_task, MemoryRevocationRegistry, RevocationRegistry};
pub use token::{AccessCredential, Audience, Claims, CredentialPair, TokenCodec, TokenUse};
