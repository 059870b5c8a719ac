//! Session lifecycle: creation at login, validation on every authenticated
//! request, revocation.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    clock::Clock,
    error::{InvalidReason, SessionError},
    fingerprint::{fingerprint, RequestContext},
    revocation::{RevocationAuthority, RevokeOutcome},
    store::SessionStore,
};
use crate::models::{Actor, Role, Session, SessionStatus};

/// Reason recorded on sessions evicted by the per-principal limit.
pub const SESSION_LIMIT_REASON: &str = "session limit exceeded";

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Absolute lifetime from creation. Activity never extends it.
    pub ttl: Duration,
    /// Active sessions allowed per principal; 0 disables the limit.
    pub max_sessions_per_principal: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
            max_sessions_per_principal: 0,
        }
    }
}

/// A freshly created session and the bearer token bound to it. The token is
/// not recoverable afterwards.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session: Session,
    pub token: String,
}

#[derive(Clone)]
pub struct SessionLifecycle {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    authority: RevocationAuthority,
    policy: SessionPolicy,
}

impl SessionLifecycle {
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        authority: RevocationAuthority,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            authority,
            policy,
        }
    }

    /// Create a session for a principal that just authenticated.
    pub async fn create_session(
        &self,
        principal_id: Uuid,
        tenant_id: Option<Uuid>,
        role: Role,
        context: &RequestContext,
    ) -> Result<IssuedSession, SessionError> {
        let now = self.clock.now();

        if self.policy.max_sessions_per_principal > 0 {
            self.enforce_session_limit(principal_id, now).await?;
        }

        let token = generate_session_token();
        let session = Session::new(
            principal_id,
            tenant_id,
            role,
            fingerprint(context),
            &token,
            now,
            self.policy.ttl,
        );

        self.store.insert(&session).await?;

        counter!("sessions_created_total").increment(1);
        info!(
            session_id = %session.id,
            principal_id = %principal_id,
            tenant_id = ?tenant_id,
            device_name = %session.device_name,
            ip_address = %session.ip_address,
            "Session created"
        );

        Ok(IssuedSession { session, token })
    }

    /// Gate for every authenticated request: one lookup, one conditional
    /// write of `last_seen_at`.
    pub async fn validate_and_touch(&self, token: &str) -> Result<Session, SessionError> {
        let now = self.clock.now();

        let result = self.check_token(token, now).await;
        let mut session = match result {
            Ok(session) => session,
            Err(SessionError::SessionInvalid(reason)) => {
                counter!("session_validations_total", "outcome" => reason.as_str()).increment(1);
                warn!(cause = %reason, "Session validation failed");
                return Err(SessionError::SessionInvalid(reason));
            }
            Err(e) => return Err(e),
        };

        // Conditional write: a revocation that landed after the read wins.
        if !self.store.touch(session.id, now).await? {
            counter!("session_validations_total", "outcome" => InvalidReason::Revoked.as_str())
                .increment(1);
            warn!(session_id = %session.id, "Session ended before it could be touched");
            return Err(SessionError::SessionInvalid(InvalidReason::Revoked));
        }
        if now > session.last_seen_at {
            session.last_seen_at = now;
        }

        counter!("session_validations_total", "outcome" => "valid").increment(1);
        Ok(session)
    }

    async fn check_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        if token.trim().is_empty() {
            return Err(SessionError::SessionInvalid(InvalidReason::Missing));
        }

        let session = self
            .store
            .find_by_token_hash(&Session::hash_token(token))
            .await?
            .ok_or(SessionError::SessionInvalid(InvalidReason::Unknown))?;

        match session.status_at(now) {
            SessionStatus::Active => Ok(session),
            SessionStatus::Expired => {
                tracing::debug!(session_id = %session.id, "Expired session presented");
                Err(SessionError::SessionInvalid(InvalidReason::Expired))
            }
            SessionStatus::Revoked => {
                tracing::debug!(session_id = %session.id, "Revoked session presented");
                Err(SessionError::SessionInvalid(InvalidReason::Revoked))
            }
        }
    }

    /// Revoke one session; authorization is delegated to the authority.
    pub async fn revoke(
        &self,
        session_id: Uuid,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<RevokeOutcome, SessionError> {
        self.authority.revoke(session_id, actor, reason).await
    }

    /// "Log out everywhere" for `principal_id`, optionally sparing `keep`.
    pub async fn revoke_all(
        &self,
        principal_id: Uuid,
        actor: &Actor,
        reason: Option<&str>,
        keep: Option<Uuid>,
    ) -> Result<u64, SessionError> {
        self.authority
            .revoke_all(principal_id, actor, reason, keep)
            .await
    }

    /// Evict the oldest active sessions so the new one fits under the limit.
    async fn enforce_session_limit(
        &self,
        principal_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let mut active: Vec<Session> = self
            .store
            .list_by_principal(principal_id)
            .await?
            .into_iter()
            .filter(|s| s.is_active_at(now))
            .collect();

        let limit = self.policy.max_sessions_per_principal;
        if active.len() < limit {
            return Ok(());
        }

        active.sort_by_key(|s| s.created_at);
        let excess = active.len() + 1 - limit;

        for oldest in active.iter().take(excess) {
            if self
                .store
                .mark_revoked(oldest.id, now, SESSION_LIMIT_REASON)
                .await?
            {
                counter!("sessions_evicted_total").increment(1);
                info!(
                    principal_id = %principal_id,
                    session_id = %oldest.id,
                    limit,
                    "Revoked oldest session due to session limit"
                );
            }
        }
        Ok(())
    }
}

/// 256-bit random bearer token, hex encoded.
fn generate_session_token() -> String {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; 32] = rng.gen();
    hex::encode(token_bytes)
}
