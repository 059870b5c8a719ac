//! Session record store contract.
//!
//! Pure persistence, no business rules. Implementations must make `touch`
//! and `mark_revoked` atomic per session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Session;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session. Fails if the id or token hash already exists.
    async fn insert(&self, session: &Session) -> Result<(), anyhow::Error>;

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<Session>, anyhow::Error>;

    async fn find_by_token_hash(&self, token_hash: &str)
        -> Result<Option<Session>, anyhow::Error>;

    /// All sessions of a principal, newest `created_at` first.
    async fn list_by_principal(&self, principal_id: Uuid) -> Result<Vec<Session>, anyhow::Error>;

    /// Raise `last_seen_at` to `seen_at` if the session is still active at
    /// `seen_at`; never moves it backwards.
    ///
    /// Returns `false`, writing nothing, when the session is missing, revoked
    /// or expired at `seen_at`.
    async fn touch(&self, session_id: Uuid, seen_at: DateTime<Utc>) -> Result<bool, anyhow::Error>;

    /// Transition "not revoked" -> "revoked" at most once.
    ///
    /// Returns `true` only for the call that performed the transition. A
    /// session that is already revoked (or missing) yields `false` and is
    /// left untouched.
    async fn mark_revoked(
        &self,
        session_id: Uuid,
        revoked_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<bool, anyhow::Error>;

    /// Delete sessions that ended (expired or revoked) before `cutoff`.
    async fn purge_ended_before(&self, cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error>;

    async fn health_check(&self) -> Result<(), anyhow::Error>;
}
