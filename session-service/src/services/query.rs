//! Read side: session listings and per-principal statistics.
//!
//! Nothing here writes to the store; in particular `last_seen_at` is never
//! touched by a read.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{clock::Clock, error::SessionError, revocation::authorize_principal, store::SessionStore};
use crate::models::{Actor, Session, SessionStatus};

/// Trailing window for `recent_logins`.
pub fn recent_login_window() -> Duration {
    Duration::hours(24)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SessionStats {
    pub total_active: u64,
    pub total_expired: u64,
    pub total_revoked: u64,
    /// Sessions created in the last 24 hours, any status.
    pub recent_logins: u64,
}

impl SessionStats {
    /// Classify every session against one shared `now`.
    pub fn tally(sessions: &[Session], now: DateTime<Utc>) -> Self {
        let recent_since = now - recent_login_window();
        let mut stats = SessionStats::default();

        for session in sessions {
            match session.status_at(now) {
                SessionStatus::Active => stats.total_active += 1,
                SessionStatus::Expired => stats.total_expired += 1,
                SessionStatus::Revoked => stats.total_revoked += 1,
            }
            if session.created_at > recent_since && session.created_at <= now {
                stats.recent_logins += 1;
            }
        }
        stats
    }

    pub fn total(&self) -> u64 {
        self.total_active + self.total_expired + self.total_revoked
    }
}

/// A listing taken at one instant, so every row's status agrees.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub as_of: DateTime<Utc>,
    pub sessions: Vec<Session>,
}

#[derive(Clone)]
pub struct SessionQueryService {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl SessionQueryService {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// All of a principal's sessions, newest first, every status included.
    pub async fn list_sessions(&self, principal_id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let as_of = self.clock.now();
        let sessions = self.store.list_by_principal(principal_id).await?;
        Ok(SessionSnapshot { as_of, sessions })
    }

    pub async fn compute_stats(&self, principal_id: Uuid) -> Result<SessionStats, SessionError> {
        let sessions = self.store.list_by_principal(principal_id).await?;
        Ok(SessionStats::tally(&sessions, self.clock.now()))
    }

    /// Listing on behalf of another actor; same scope rule as revocation.
    pub async fn list_sessions_for(
        &self,
        principal_id: Uuid,
        actor: &Actor,
    ) -> Result<SessionSnapshot, SessionError> {
        let snapshot = self.list_sessions(principal_id).await?;
        authorize_principal(actor, principal_id, &snapshot.sessions)?;
        Ok(snapshot)
    }

    pub async fn stats_for(
        &self,
        principal_id: Uuid,
        actor: &Actor,
    ) -> Result<SessionStats, SessionError> {
        let sessions = self.store.list_by_principal(principal_id).await?;
        authorize_principal(actor, principal_id, &sessions)?;
        Ok(SessionStats::tally(&sessions, self.clock.now()))
    }
}
