//! In-memory session store for tests and single-node development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

use super::store::SessionStore;
use crate::models::Session;

/// DashMap-backed store. Per-key shard locks make `touch` and `mark_revoked`
/// atomic for a given session.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<Uuid, Session>,
    by_token: DashMap<String, Uuid>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: &Session) -> Result<(), anyhow::Error> {
        match self.by_token.entry(session.token_hash.clone()) {
            Entry::Occupied(_) => anyhow::bail!("duplicate session token hash"),
            Entry::Vacant(slot) => {
                match self.sessions.entry(session.id) {
                    Entry::Occupied(_) => anyhow::bail!("duplicate session id {}", session.id),
                    Entry::Vacant(row) => {
                        row.insert(session.clone());
                    }
                }
                slot.insert(session.id);
            }
        }
        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<Session>, anyhow::Error> {
        Ok(self.sessions.get(&session_id).map(|s| s.value().clone()))
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, anyhow::Error> {
        let Some(session_id) = self.by_token.get(token_hash).map(|id| *id.value()) else {
            return Ok(None);
        };
        self.find_by_id(session_id).await
    }

    async fn list_by_principal(&self, principal_id: Uuid) -> Result<Vec<Session>, anyhow::Error> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.principal_id == principal_id)
            .map(|s| s.value().clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn touch(&self, session_id: Uuid, seen_at: DateTime<Utc>) -> Result<bool, anyhow::Error> {
        let Some(mut session) = self.sessions.get_mut(&session_id) else {
            return Ok(false);
        };
        if !session.is_active_at(seen_at) {
            return Ok(false);
        }
        if seen_at > session.last_seen_at {
            session.last_seen_at = seen_at;
        }
        Ok(true)
    }

    async fn mark_revoked(
        &self,
        session_id: Uuid,
        revoked_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<bool, anyhow::Error> {
        let Some(mut session) = self.sessions.get_mut(&session_id) else {
            return Ok(false);
        };
        if session.revoked_at.is_some() {
            return Ok(false);
        }
        session.revoked_at = Some(revoked_at);
        session.revoked_reason = Some(reason.to_string());
        Ok(true)
    }

    async fn purge_ended_before(&self, cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error> {
        let mut purged_hashes = Vec::new();
        self.sessions.retain(|_, session| {
            if session.ended_at() < cutoff {
                purged_hashes.push(session.token_hash.clone());
                false
            } else {
                true
            }
        });
        for hash in &purged_hashes {
            self.by_token.remove(hash);
        }
        Ok(purged_hashes.len() as u64)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
