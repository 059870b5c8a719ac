//! PostgreSQL store tests. Run with a database available:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::{Duration, Utc};
use session_service::{
    config::DatabaseConfig,
    db,
    models::{Role, Session},
    services::{Fingerprint, PgSessionStore, SessionStore},
};
use uuid::Uuid;

async fn store() -> PgSessionStore {
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/sessions_test".to_string()),
        max_connections: 5,
        min_connections: 1,
    };
    let pool = db::create_pool(&config).await.expect("Failed to connect to DB");
    db::run_migrations(&pool).await.expect("Failed to run migrations");
    PgSessionStore::new(pool)
}

fn new_session(principal_id: Uuid, created_at: chrono::DateTime<Utc>) -> Session {
    Session::new(
        principal_id,
        Some(Uuid::new_v4()),
        Role::Admin,
        Fingerprint::unknown(),
        &Uuid::new_v4().to_string(),
        created_at,
        Duration::hours(24),
    )
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_round_trip_and_lookup_by_token_hash() {
    let store = store().await;
    let session = new_session(Uuid::new_v4(), Utc::now());
    store.insert(&session).await.unwrap();

    let found = store
        .find_by_token_hash(&session.token_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, session.id);
    assert_eq!(found.role, Role::Admin);
    assert_eq!(found.tenant_id, session.tenant_id);

    assert!(store.insert(&session).await.is_err());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_touch_is_monotonic() {
    let store = store().await;
    let now = Utc::now();
    let session = new_session(Uuid::new_v4(), now);
    store.insert(&session).await.unwrap();

    assert!(store.touch(session.id, now + Duration::minutes(10)).await.unwrap());
    assert!(store.touch(session.id, now + Duration::minutes(5)).await.unwrap());

    let found = store.find_by_id(session.id).await.unwrap().unwrap();
    assert_eq!(
        found.last_seen_at.timestamp_micros(),
        (now + Duration::minutes(10)).timestamp_micros()
    );
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_mark_revoked_transitions_once() {
    let store = store().await;
    let session = new_session(Uuid::new_v4(), Utc::now());
    store.insert(&session).await.unwrap();

    let (a, b) = futures::join!(
        store.mark_revoked(session.id, Utc::now(), "first"),
        store.mark_revoked(session.id, Utc::now(), "second"),
    );
    assert!(a.unwrap() ^ b.unwrap());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_list_newest_first_and_purge() {
    let store = store().await;
    let principal = Uuid::new_v4();
    let now = Utc::now();
    let old = new_session(principal, now - Duration::days(30));
    let fresh = new_session(principal, now);
    store.insert(&old).await.unwrap();
    store.insert(&fresh).await.unwrap();

    let ids: Vec<Uuid> = store
        .list_by_principal(principal)
        .await
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec![fresh.id, old.id]);

    store.purge_ended_before(now - Duration::days(7)).await.unwrap();
    assert!(store.find_by_id(old.id).await.unwrap().is_none());
    assert!(store.find_by_id(fresh.id).await.unwrap().is_some());
}
