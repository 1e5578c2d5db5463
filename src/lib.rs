//! Authentication and authorization for a gym-management backend.
//!
//! The crate is organized around a single facade, [`AuthService`], which
//! orchestrates the pieces underneath it:
//!
//! - [`services::token::TokenCodec`]: signed, expiring bearer credentials
//!   (access + refresh) with deterministic error classification.
//! - [`services::revocation::RevocationRegistry`]: denylist consulted before
//!   any verified credential is trusted.
//! - [`services::lockout::LockoutTracker`]: failed-attempt counting and
//!   time-boxed account locks.
//! - [`services::identity::ExternalIdentityLinker`]: resolves OAuth-style
//!   profiles to local principals (match, link or create).
//! - [`services::permissions`]: role hierarchy plus per-principal overrides.
//!
//! Storage is abstracted behind [`store::PrincipalStore`]; an in-memory
//! implementation is provided for embedding and tests.

pub mod config;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::AuthConfig;
pub use services::{AuthError, AuthService, AuthenticatedPrincipal, Requirement};
