mod common;

use chrono::Duration;
use common::{admin, member, TestApp};
use session_service::{
    models::{Role, SessionStatus},
    services::{
        revocation::{DEFAULT_ADMIN_REASON, DEFAULT_SELF_REASON},
        RevokeOutcome, SessionError, SessionStore,
    },
};
use uuid::Uuid;

#[tokio::test]
async fn test_self_revoke_uses_default_reason() {
    let app = TestApp::new();
    let principal = Uuid::new_v4();
    let issued = app.login(principal, None, Role::Member).await;

    app.clock.advance(Duration::minutes(5));
    let outcome = app
        .lifecycle()
        .revoke(issued.session.id, &member(principal, None), None)
        .await
        .unwrap();
    assert_eq!(outcome, RevokeOutcome::Revoked);

    let stored = app.store.find_by_id(issued.session.id).await.unwrap().unwrap();
    assert_eq!(stored.revoked_at, Some(common::start_time() + Duration::minutes(5)));
    assert_eq!(stored.revoked_reason.as_deref(), Some(DEFAULT_SELF_REASON));
}

#[tokio::test]
async fn test_second_revoke_keeps_original_reason() {
    let app = TestApp::new();
    let principal = Uuid::new_v4();
    let issued = app.login(principal, None, Role::Member).await;
    let actor = member(principal, None);

    app.lifecycle()
        .revoke(issued.session.id, &actor, Some("lost phone"))
        .await
        .unwrap();
    app.clock.advance(Duration::minutes(1));
    let outcome = app
        .lifecycle()
        .revoke(issued.session.id, &actor, Some("second attempt"))
        .await
        .unwrap();
    assert_eq!(outcome, RevokeOutcome::AlreadyRevoked);

    let stored = app.store.find_by_id(issued.session.id).await.unwrap().unwrap();
    assert_eq!(stored.revoked_reason.as_deref(), Some("lost phone"));
    assert_eq!(stored.revoked_at, Some(common::start_time()));
}

#[tokio::test]
async fn test_concurrent_revokes_transition_once() {
    let app = TestApp::new();
    let principal = Uuid::new_v4();
    let issued = app.login(principal, None, Role::Member).await;
    let actor = member(principal, None);

    let (a, b) = futures::join!(
        app.lifecycle().revoke(issued.session.id, &actor, Some("first")),
        app.lifecycle().revoke(issued.session.id, &actor, Some("second")),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == RevokeOutcome::Revoked)
            .count(),
        1
    );
    let stored = app.store.find_by_id(issued.session.id).await.unwrap().unwrap();
    assert!(matches!(stored.revoked_reason.as_deref(), Some("first") | Some("second")));
}

#[tokio::test]
async fn test_tenant_admin_revokes_within_tenant() {
    let app = TestApp::new();
    let tenant = Uuid::new_v4();
    let issued = app.login(Uuid::new_v4(), Some(tenant), Role::Member).await;

    let outcome = app
        .lifecycle()
        .revoke(issued.session.id, &admin(Some(tenant)), None)
        .await
        .unwrap();
    assert_eq!(outcome, RevokeOutcome::Revoked);

    let stored = app.store.find_by_id(issued.session.id).await.unwrap().unwrap();
    assert_eq!(stored.revoked_reason.as_deref(), Some(DEFAULT_ADMIN_REASON));
}

#[tokio::test]
async fn test_cross_tenant_admin_is_forbidden_without_state_change() {
    let app = TestApp::new();
    let issued = app
        .login(Uuid::new_v4(), Some(Uuid::new_v4()), Role::Member)
        .await;

    let err = app
        .lifecycle()
        .revoke(issued.session.id, &admin(Some(Uuid::new_v4())), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Forbidden));

    let stored = app.store.find_by_id(issued.session.id).await.unwrap().unwrap();
    assert!(stored.revoked_at.is_none());
    assert!(stored.revoked_reason.is_none());
}

#[tokio::test]
async fn test_member_cannot_revoke_peer_session() {
    let app = TestApp::new();
    let tenant = Uuid::new_v4();
    let issued = app.login(Uuid::new_v4(), Some(tenant), Role::Member).await;

    let err = app
        .lifecycle()
        .revoke(issued.session.id, &member(Uuid::new_v4(), Some(tenant)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Forbidden));
}

#[tokio::test]
async fn test_platform_admin_revokes_any_session() {
    let app = TestApp::new();
    let issued = app
        .login(Uuid::new_v4(), Some(Uuid::new_v4()), Role::Member)
        .await;

    let outcome = app
        .lifecycle()
        .revoke(issued.session.id, &admin(None), Some("security incident"))
        .await
        .unwrap();
    assert_eq!(outcome, RevokeOutcome::Revoked);
}

#[tokio::test]
async fn test_unknown_session_is_forbidden_for_scoped_actors() {
    let app = TestApp::new();
    let principal = Uuid::new_v4();
    app.login(principal, None, Role::Member).await;

    for actor in [member(principal, None), admin(Some(Uuid::new_v4()))] {
        let err = app
            .lifecycle()
            .revoke(Uuid::new_v4(), &actor, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Forbidden));
    }
}

#[tokio::test]
async fn test_unknown_session_is_not_found_for_platform_admin() {
    let app = TestApp::new();
    let err = app
        .lifecycle()
        .revoke(Uuid::new_v4(), &admin(None), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotFound));
}

#[tokio::test]
async fn test_revoking_expired_session_reports_revoked_status() {
    let app = TestApp::new();
    let principal = Uuid::new_v4();
    let issued = app.login(principal, None, Role::Member).await;

    app.clock.advance(Duration::hours(48));
    app.lifecycle()
        .revoke(issued.session.id, &member(principal, None), None)
        .await
        .unwrap();

    let stored = app.store.find_by_id(issued.session.id).await.unwrap().unwrap();
    assert_eq!(stored.status_at(app.now()), SessionStatus::Revoked);
}

#[tokio::test]
async fn test_revoke_all_keeps_current_session() {
    let app = TestApp::new();
    let principal = Uuid::new_v4();
    let current = app.login(principal, None, Role::Member).await;
    let other_a = app.login(principal, None, Role::Member).await;
    let other_b = app.login(principal, None, Role::Member).await;
    let stranger = app.login(Uuid::new_v4(), None, Role::Member).await;

    let revoked = app
        .lifecycle()
        .revoke_all(
            principal,
            &member(principal, None),
            None,
            Some(current.session.id),
        )
        .await
        .unwrap();
    assert_eq!(revoked, 2);

    let now = app.now();
    for (id, expected) in [
        (current.session.id, SessionStatus::Active),
        (other_a.session.id, SessionStatus::Revoked),
        (other_b.session.id, SessionStatus::Revoked),
        (stranger.session.id, SessionStatus::Active),
    ] {
        let stored = app.store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status_at(now), expected);
    }
}

#[tokio::test]
async fn test_revoke_all_skips_already_ended_sessions() {
    let app = TestApp::new();
    let principal = Uuid::new_v4();
    let actor = member(principal, None);
    let revoked_earlier = app.login(principal, None, Role::Member).await;
    app.lifecycle()
        .revoke(revoked_earlier.session.id, &actor, Some("lost phone"))
        .await
        .unwrap();
    app.login(principal, None, Role::Member).await;

    let revoked = app
        .lifecycle()
        .revoke_all(principal, &actor, Some("log out everywhere"), None)
        .await
        .unwrap();
    assert_eq!(revoked, 1);

    let stored = app
        .store
        .find_by_id(revoked_earlier.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.revoked_reason.as_deref(), Some("lost phone"));
}

#[tokio::test]
async fn test_revoke_all_by_foreign_admin_is_forbidden() {
    let app = TestApp::new();
    let principal = Uuid::new_v4();
    let tenant = Uuid::new_v4();
    app.login(principal, Some(tenant), Role::Member).await;

    let err = app
        .lifecycle()
        .revoke_all(principal, &admin(Some(Uuid::new_v4())), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Forbidden));

    let count = app
        .lifecycle()
        .revoke_all(principal, &admin(Some(tenant)), None, None)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
