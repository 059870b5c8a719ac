//! Revocation authority.
//!
//! Decides who may revoke (or administratively inspect) which sessions and
//! performs the single "not revoked -> revoked" write.

use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{clock::Clock, error::SessionError, store::SessionStore};
use crate::models::{Actor, Session};

pub const DEFAULT_SELF_REASON: &str = "revoked by user";
pub const DEFAULT_ADMIN_REASON: &str = "revoked by admin";

/// Which rule granted access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationKind {
    SelfService,
    Administrative,
}

impl RevocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationKind::SelfService => "self",
            RevocationKind::Administrative => "admin",
        }
    }

    pub fn default_reason(&self) -> &'static str {
        match self {
            RevocationKind::SelfService => DEFAULT_SELF_REASON,
            RevocationKind::Administrative => DEFAULT_ADMIN_REASON,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// This call performed the revocation.
    Revoked,
    /// Someone got there first; nothing was written.
    AlreadyRevoked,
}

/// Authorization rule for a session owned by `owner` in `tenant`.
///
/// Owners may always act on their own sessions. Admins may act inside their
/// tenant, platform admins (no tenant) anywhere.
pub fn authorize(
    actor: &Actor,
    owner: Uuid,
    tenant: Option<Uuid>,
) -> Result<RevocationKind, SessionError> {
    if actor.principal_id == owner {
        return Ok(RevocationKind::SelfService);
    }
    if actor.is_platform_admin() {
        return Ok(RevocationKind::Administrative);
    }
    if actor.is_admin() && actor.tenant_id.is_some() && actor.tenant_id == tenant {
        return Ok(RevocationKind::Administrative);
    }
    Err(SessionError::Forbidden)
}

/// Authorization over every session of one principal. An admin must have
/// scope over all of them. A principal with no sessions is in nobody's tenant
/// scope, so only platform admins see it as empty.
pub fn authorize_principal(
    actor: &Actor,
    principal_id: Uuid,
    sessions: &[Session],
) -> Result<RevocationKind, SessionError> {
    if actor.principal_id == principal_id {
        return Ok(RevocationKind::SelfService);
    }
    if actor.is_platform_admin() {
        return Ok(RevocationKind::Administrative);
    }
    if !actor.is_admin() || sessions.is_empty() {
        return Err(SessionError::Forbidden);
    }
    for session in sessions {
        authorize(actor, session.principal_id, session.tenant_id)?;
    }
    Ok(RevocationKind::Administrative)
}

/// Caller-supplied reason, or the default for `kind` when blank.
pub fn resolve_reason(reason: Option<&str>, kind: RevocationKind) -> String {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(kind.default_reason())
        .to_string()
}

#[derive(Clone)]
pub struct RevocationAuthority {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl RevocationAuthority {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Revoke one session on behalf of `actor`. Idempotent.
    ///
    /// Only a platform admin learns that an id does not exist; anyone else
    /// gets the same `Forbidden` as for a session outside their scope.
    pub async fn revoke(
        &self,
        session_id: Uuid,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<RevokeOutcome, SessionError> {
        let session = match self.store.find_by_id(session_id).await? {
            Some(session) => session,
            None if actor.is_platform_admin() => return Err(SessionError::NotFound),
            None => {
                warn!(
                    session_id = %session_id,
                    actor_id = %actor.principal_id,
                    "Revocation attempt for unknown session"
                );
                return Err(SessionError::Forbidden);
            }
        };

        let kind = authorize(actor, session.principal_id, session.tenant_id).inspect_err(|_| {
            warn!(
                session_id = %session_id,
                actor_id = %actor.principal_id,
                actor_tenant = ?actor.tenant_id,
                "Forbidden session revocation attempt"
            );
        })?;

        self.apply(&session, actor, kind, reason).await
    }

    /// Revoke every active session of `principal_id`, except `keep`.
    /// Returns how many sessions this call revoked.
    pub async fn revoke_all(
        &self,
        principal_id: Uuid,
        actor: &Actor,
        reason: Option<&str>,
        keep: Option<Uuid>,
    ) -> Result<u64, SessionError> {
        let sessions = self.store.list_by_principal(principal_id).await?;
        let kind = authorize_principal(actor, principal_id, &sessions).inspect_err(|_| {
            warn!(
                principal_id = %principal_id,
                actor_id = %actor.principal_id,
                "Forbidden bulk session revocation attempt"
            );
        })?;

        let now = self.clock.now();
        let mut revoked = 0;
        for session in sessions
            .iter()
            .filter(|s| s.is_active_at(now) && Some(s.id) != keep)
        {
            if self.apply(session, actor, kind, reason).await? == RevokeOutcome::Revoked {
                revoked += 1;
            }
        }

        info!(
            principal_id = %principal_id,
            actor_id = %actor.principal_id,
            revoked,
            "Revoked principal sessions"
        );
        Ok(revoked)
    }

    async fn apply(
        &self,
        session: &Session,
        actor: &Actor,
        kind: RevocationKind,
        reason: Option<&str>,
    ) -> Result<RevokeOutcome, SessionError> {
        if session.revoked_at.is_some() {
            return Ok(RevokeOutcome::AlreadyRevoked);
        }

        let reason = resolve_reason(reason, kind);
        let performed = self
            .store
            .mark_revoked(session.id, self.clock.now(), &reason)
            .await?;

        if !performed {
            return Ok(RevokeOutcome::AlreadyRevoked);
        }

        counter!("sessions_revoked_total", "kind" => kind.as_str()).increment(1);
        info!(
            session_id = %session.id,
            principal_id = %session.principal_id,
            actor_id = %actor.principal_id,
            kind = kind.as_str(),
            reason = %reason,
            "Session revoked"
        );
        Ok(RevokeOutcome::Revoked)
    }
}
