//! External identity model - third-party profiles linked to local principals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported third-party identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProvider {
    Google,
    Facebook,
    Apple,
}

impl IdentityProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityProvider::Google => "google",
            IdentityProvider::Facebook => "facebook",
            IdentityProvider::Apple => "apple",
        }
    }
}

impl std::str::FromStr for IdentityProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(IdentityProvider::Google),
            "facebook" => Ok(IdentityProvider::Facebook),
            "apple" => Ok(IdentityProvider::Apple),
            _ => Err(format!("Invalid identity provider: {}", s)),
        }
    }
}

impl std::fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (provider, external id) pair bound to a principal. At most one binding
/// per provider per principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityBinding {
    pub provider: IdentityProvider,
    pub external_id: String,
    pub linked_at: DateTime<Utc>,
}

impl IdentityBinding {
    pub fn new(provider: IdentityProvider, external_id: String) -> Self {
        Self {
            provider,
            external_id,
            linked_at: Utc::now(),
        }
    }
}

/// Profile asserted by an external provider after its own OAuth exchange.
/// The transport layer performs the code/token dance; this crate only sees
/// the resulting profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalProfile {
    /// Provider-scoped subject identifier.
    pub id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
}

impl ExternalProfile {
    /// The email, if the provider supplied one it has verified. Linking and
    /// account creation both require this.
    pub fn usable_email(&self) -> Option<&str> {
        match &self.email {
            Some(e) if self.email_verified && !e.trim().is_empty() => Some(e.as_str()),
            _ => None,
        }
    }
}
