#![allow(dead_code)]

use std::sync::Arc;

use gym_auth::config::{AuthConfig, Environment, LockoutConfig, ProviderConfig, TokenConfig};
use gym_auth::models::{IdentityProvider, Principal, Role};
use gym_auth::services::{AuthService, MemoryRevocationRegistry};
use gym_auth::store::{MemoryPrincipalStore, PrincipalStore};
use gym_auth::utils::{hash_password, Password};

pub const SECRET: &str = "integration-test-secret-0123456789ab";

/// Service wired over in-memory backends, with the concrete store kept
/// around so tests can mutate principals directly.
pub struct Harness {
    pub service: AuthService,
    pub store: Arc<MemoryPrincipalStore>,
}

pub fn harness() -> Harness {
    init_tracing();
    let store = Arc::new(MemoryPrincipalStore::new());
    let revocations = Arc::new(MemoryRevocationRegistry::new());
    let service = AuthService::new(test_config(), store.clone(), revocations)
        .expect("service construction");
    Harness { service, store }
}

/// Google configured, Facebook and Apple not.
pub fn test_config() -> AuthConfig {
    AuthConfig {
        environment: Environment::Dev,
        token: TokenConfig {
            secret: SECRET.to_string(),
            issuer: "gym-backend".to_string(),
            access_token_expiry_hours: 8,
            refresh_token_expiry_days: 7,
        },
        lockout: LockoutConfig {
            max_failed_attempts: 5,
            lockout_duration_minutes: 30,
        },
        providers: vec![ProviderConfig {
            provider: IdentityProvider::Google,
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            callback_path: "/auth/google/callback".to_string(),
        }],
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub async fn seed_member(store: &MemoryPrincipalStore, email: &str, password: &str) -> Principal {
    let hash = hash_password(&Password::new(password.to_string())).expect("hash");
    store
        .create(Principal::new_member(email.to_string(), hash.into_string()))
        .await
        .expect("seed member")
}

pub async fn seed_staff(
    store: &MemoryPrincipalStore,
    email: &str,
    password: &str,
    role: Role,
) -> Principal {
    let hash = hash_password(&Password::new(password.to_string())).expect("hash");
    store
        .create(Principal::new_staff(
            email.to_string(),
            hash.into_string(),
            role,
        ))
        .await
        .expect("seed staff")
}

pub async fn deactivate(store: &MemoryPrincipalStore, mut principal: Principal) -> Principal {
    principal.active = false;
    store.update(principal).await.expect("deactivate")
}
