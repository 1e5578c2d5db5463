use std::env;

use serde::Deserialize;

use crate::models::IdentityProvider;

/// Top-level configuration for the auth core, loaded from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub environment: Environment,
    pub token: TokenConfig,
    pub lockout: LockoutConfig,
    /// Explicit per-provider OAuth configuration. Provider availability is a
    /// pure function of this list; there is no module-level OAuth state.
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

/// Credential signing and lifetime parameters. The secret is a symmetric
/// HMAC-SHA256 key; the issuer string is fixed per deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub access_token_expiry_hours: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockoutConfig {
    pub max_failed_attempts: u32,
    pub lockout_duration_minutes: i64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub provider: IdentityProvider,
    pub client_id: String,
    pub client_secret: String,
    pub callback_path: String,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        let is_prod = environment == Environment::Prod;

        let config = AuthConfig {
            environment,
            token: TokenConfig {
                secret: get_env("AUTH_TOKEN_SECRET", None, is_prod)?,
                issuer: get_env("AUTH_TOKEN_ISSUER", Some("gym-backend"), is_prod)?,
                access_token_expiry_hours: get_env(
                    "AUTH_ACCESS_TOKEN_EXPIRY_HOURS",
                    Some("8"),
                    is_prod,
                )?
                .parse()
                .map_err(|e: std::num::ParseIntError| anyhow::anyhow!(e.to_string()))?,
                refresh_token_expiry_days: get_env(
                    "AUTH_REFRESH_TOKEN_EXPIRY_DAYS",
                    Some("7"),
                    is_prod,
                )?
                .parse()
                .map_err(|e: std::num::ParseIntError| anyhow::anyhow!(e.to_string()))?,
            },
            lockout: LockoutConfig {
                max_failed_attempts: get_env("AUTH_LOCKOUT_MAX_FAILED_ATTEMPTS", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                lockout_duration_minutes: get_env(
                    "AUTH_LOCKOUT_DURATION_MINUTES",
                    Some("30"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(30),
            },
            providers: load_providers()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Whether a provider has credentials configured. Pure over the config
    /// struct; used by the facade to fail external logins early with
    /// `ProviderUnavailable`.
    pub fn is_provider_available(&self, provider: IdentityProvider) -> bool {
        self.providers.iter().any(|p| p.provider == provider)
    }

    pub fn provider(&self, provider: IdentityProvider) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.provider == provider)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.token.secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "AUTH_TOKEN_SECRET must be at least 32 bytes"
            ));
        }

        if self.token.access_token_expiry_hours <= 0 {
            return Err(anyhow::anyhow!(
                "AUTH_ACCESS_TOKEN_EXPIRY_HOURS must be positive"
            ));
        }

        if self.token.refresh_token_expiry_days <= 0 {
            return Err(anyhow::anyhow!(
                "AUTH_REFRESH_TOKEN_EXPIRY_DAYS must be positive"
            ));
        }

        if self.lockout.max_failed_attempts == 0 {
            return Err(anyhow::anyhow!(
                "AUTH_LOCKOUT_MAX_FAILED_ATTEMPTS must be positive"
            ));
        }

        Ok(())
    }
}

/// Read per-provider OAuth settings. A provider is configured when its
/// client id is present; the secret is then required too.
fn load_providers() -> Result<Vec<ProviderConfig>, anyhow::Error> {
    let mut providers = Vec::new();

    for provider in [
        IdentityProvider::Google,
        IdentityProvider::Facebook,
        IdentityProvider::Apple,
    ] {
        let prefix = provider.as_str().to_uppercase();
        let client_id = match env::var(format!("{}_CLIENT_ID", prefix)) {
            Ok(v) if !v.is_empty() => v,
            _ => continue,
        };

        let client_secret = env::var(format!("{}_CLIENT_SECRET", prefix)).map_err(|_| {
            anyhow::anyhow!(
                "{}_CLIENT_SECRET is required when {}_CLIENT_ID is set",
                prefix,
                prefix
            )
        })?;

        let callback_path = env::var(format!("{}_CALLBACK_PATH", prefix))
            .unwrap_or_else(|_| format!("/auth/{}/callback", provider.as_str()));

        providers.push(ProviderConfig {
            provider,
            client_id,
            client_secret,
            callback_path,
        });
    }

    Ok(providers)
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, anyhow::Error> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                ))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(anyhow::anyhow!("{} is required but not set", key))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
