mod common;

use common::{deactivate, harness, seed_member};
use gym_auth::models::{ExternalProfile, IdentityProvider, PrincipalKind};
use gym_auth::services::{AuthError, Audience};
use gym_auth::store::PrincipalStore;

fn google_profile(id: &str, email: &str) -> ExternalProfile {
    ExternalProfile {
        id: id.to_string(),
        email: Some(email.to_string()),
        email_verified: true,
        name: Some("Jane".to_string()),
    }
}

#[tokio::test]
async fn first_identity_login_creates_a_member() {
    let h = harness();

    let pair = h
        .service
        .login_with_identity(
            IdentityProvider::Google,
            &google_profile("g-1", "jane@gym.test"),
            Audience::Mobile,
        )
        .await
        .unwrap();

    let principal = h.service.verify_request(&pair.access_token).await.unwrap();
    assert_eq!(principal.kind, PrincipalKind::MemberLike);
    assert!(principal.role.is_none());

    let stored = h
        .store
        .find_by_external_id(IdentityProvider::Google, "g-1")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.email_verified);
    assert!(stored.password_hash.is_none());
}

#[tokio::test]
async fn repeat_identity_login_reuses_the_principal() {
    let h = harness();
    let profile = google_profile("g-1", "jane@gym.test");

    let first = h
        .service
        .login_with_identity(IdentityProvider::Google, &profile, Audience::Web)
        .await
        .unwrap();
    let second = h
        .service
        .login_with_identity(IdentityProvider::Google, &profile, Audience::Web)
        .await
        .unwrap();

    let a = h.service.verify_request(&first.access_token).await.unwrap();
    let b = h
        .service
        .verify_request(&second.access_token)
        .await
        .unwrap();
    assert_eq!(a.id, b.id);
}

#[tokio::test]
async fn identity_login_links_to_an_existing_password_account() {
    let h = harness();
    let existing = seed_member(&h.store, "jane@gym.test", "s3cret-pass").await;

    let pair = h
        .service
        .login_with_identity(
            IdentityProvider::Google,
            &google_profile("g-1", "jane@gym.test"),
            Audience::Web,
        )
        .await
        .unwrap();

    let principal = h.service.verify_request(&pair.access_token).await.unwrap();
    assert_eq!(principal.id, existing.id);

    // Both credentials now work for the same account.
    assert!(h
        .service
        .login("jane@gym.test", "s3cret-pass", Audience::Web)
        .await
        .is_ok());
}

#[tokio::test]
async fn unconfigured_provider_is_refused_up_front() {
    let h = harness();

    let result = h
        .service
        .login_with_identity(
            IdentityProvider::Facebook,
            &google_profile("f-1", "jane@gym.test"),
            Audience::Web,
        )
        .await;

    assert!(matches!(result, Err(AuthError::ProviderUnavailable(_))));
    assert!(h
        .store
        .find_by_email("jane@gym.test")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn profile_without_verified_email_is_incomplete() {
    let h = harness();
    let mut profile = google_profile("g-1", "jane@gym.test");
    profile.email_verified = false;

    let result = h
        .service
        .login_with_identity(IdentityProvider::Google, &profile, Audience::Web)
        .await;

    assert!(matches!(
        result,
        Err(AuthError::IdentityProfileIncomplete(_))
    ));
}

#[tokio::test]
async fn deactivated_linked_account_cannot_use_identity_login() {
    let h = harness();
    let profile = google_profile("g-1", "jane@gym.test");
    h.service
        .login_with_identity(IdentityProvider::Google, &profile, Audience::Web)
        .await
        .unwrap();

    let stored = h
        .store
        .find_by_external_id(IdentityProvider::Google, "g-1")
        .await
        .unwrap()
        .unwrap();
    deactivate(&h.store, stored).await;

    let result = h
        .service
        .login_with_identity(IdentityProvider::Google, &profile, Audience::Web)
        .await;
    assert!(matches!(result, Err(AuthError::AccountInactive)));
}
