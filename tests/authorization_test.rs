mod common;

use common::{harness, seed_member, seed_staff, Harness};
use gym_auth::models::Role;
use gym_auth::services::{AuthError, Audience, AuthenticatedPrincipal, Requirement};
use gym_auth::store::PrincipalStore;
use uuid::Uuid;

async fn login_as(h: &Harness, email: &str) -> AuthenticatedPrincipal {
    let pair = h
        .service
        .login(email, "s3cret-pass", Audience::Web)
        .await
        .unwrap();
    h.service.verify_request(&pair.access_token).await.unwrap()
}

#[tokio::test]
async fn member_owns_only_their_own_resources() {
    let h = harness();
    seed_member(&h.store, "jane@gym.test", "s3cret-pass").await;
    let principal = login_as(&h, "jane@gym.test").await;

    assert!(h
        .service
        .authorize(&principal, &Requirement::Ownership(principal.id))
        .is_ok());

    let other = h
        .service
        .authorize(&principal, &Requirement::Ownership(Uuid::new_v4()));
    assert!(matches!(other, Err(AuthError::Forbidden(_))));
}

#[tokio::test]
async fn admin_bypasses_ownership() {
    let h = harness();
    seed_staff(&h.store, "boss@gym.test", "s3cret-pass", Role::Admin).await;
    let principal = login_as(&h, "boss@gym.test").await;

    assert!(h
        .service
        .authorize(&principal, &Requirement::Ownership(Uuid::new_v4()))
        .is_ok());
}

#[tokio::test]
async fn min_role_respects_the_hierarchy() {
    let h = harness();
    seed_staff(&h.store, "coach@gym.test", "s3cret-pass", Role::Staff).await;
    let staff = login_as(&h, "coach@gym.test").await;

    assert!(h
        .service
        .authorize(&staff, &Requirement::MinRole(Role::Member))
        .is_ok());
    assert!(h
        .service
        .authorize(&staff, &Requirement::MinRole(Role::Staff))
        .is_ok());
    assert!(matches!(
        h.service
            .authorize(&staff, &Requirement::MinRole(Role::Admin)),
        Err(AuthError::Forbidden(_))
    ));
}

#[tokio::test]
async fn overrides_in_the_credential_are_honored() {
    let h = harness();
    let staff = seed_staff(&h.store, "coach@gym.test", "s3cret-pass", Role::Staff).await;

    let mut updated = h.store.find_by_id(staff.id).await.unwrap().unwrap();
    updated.overrides.insert("manage_clients".to_string(), true);
    updated
        .overrides
        .insert("manage_schedules".to_string(), false);
    h.store.update(updated).await.unwrap();

    let principal = login_as(&h, "coach@gym.test").await;

    // Allow lifts a permission above the staff defaults.
    assert!(h
        .service
        .authorize(
            &principal,
            &Requirement::Permission("manage_clients".to_string())
        )
        .is_ok());

    // Deny removes one of them.
    assert!(matches!(
        h.service.authorize(
            &principal,
            &Requirement::Permission("manage_schedules".to_string())
        ),
        Err(AuthError::Forbidden(_))
    ));
}

#[tokio::test]
async fn super_admin_passes_any_permission_check() {
    let h = harness();
    seed_staff(&h.store, "root@gym.test", "s3cret-pass", Role::SuperAdmin).await;
    let principal = login_as(&h, "root@gym.test").await;

    for name in ["manage_clients", "delete_users", "anything_at_all"] {
        assert!(h
            .service
            .authorize(&principal, &Requirement::Permission(name.to_string()))
            .is_ok());
    }
}

#[tokio::test]
async fn authentication_and_authorization_failures_stay_distinct() {
    let h = harness();
    seed_member(&h.store, "jane@gym.test", "s3cret-pass").await;
    let principal = login_as(&h, "jane@gym.test").await;

    // 401 class: the request never identified a caller.
    let unauthenticated = h.service.verify_request("garbage").await.unwrap_err();
    assert!(unauthenticated.is_unauthenticated());

    // 403 class: the caller is known but not allowed.
    let forbidden = h
        .service
        .authorize(&principal, &Requirement::MinRole(Role::Staff))
        .unwrap_err();
    assert!(!forbidden.is_unauthenticated());
}

#[tokio::test]
async fn combined_requirements_compose() {
    let h = harness();
    seed_staff(&h.store, "coach@gym.test", "s3cret-pass", Role::Staff).await;
    let staff = login_as(&h, "coach@gym.test").await;

    assert!(h
        .service
        .authorize(
            &staff,
            &Requirement::AnyPermission(vec![
                "manage_clients".to_string(),
                "view_members".to_string(),
            ])
        )
        .is_ok());

    assert!(matches!(
        h.service.authorize(
            &staff,
            &Requirement::AllPermissions(vec![
                "manage_clients".to_string(),
                "view_members".to_string(),
            ])
        ),
        Err(AuthError::Forbidden(_))
    ));
}
