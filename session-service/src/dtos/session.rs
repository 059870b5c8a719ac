use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Role, Session, SessionStatus};

/// Issued by the login flow once credentials have been verified.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSessionRequest {
    pub principal_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Option<Role>,
    /// End user's `User-Agent`, forwarded by the login flow.
    #[validate(length(max = 1024))]
    pub user_agent: Option<String>,
    /// End user's address, forwarded by the login flow.
    #[validate(length(max = 64))]
    pub ip_address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionResponse {
    pub session: SessionView,
    /// Bearer token for this session. Shown once.
    pub token: String,
}

/// Session as presented to clients: stored fields plus derived status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionView {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub device_name: String,
    pub browser: String,
    pub os: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub status: SessionStatus,
    pub is_active: bool,
    /// True for the session that authenticated this request.
    pub is_current: bool,
}

impl SessionView {
    pub fn from_session(session: &Session, now: DateTime<Utc>, current: Option<Uuid>) -> Self {
        let status = session.status_at(now);
        Self {
            id: session.id,
            principal_id: session.principal_id,
            tenant_id: session.tenant_id,
            device_name: session.device_name.clone(),
            browser: session.browser.clone(),
            os: session.os.clone(),
            ip_address: session.ip_address.clone(),
            created_at: session.created_at,
            last_seen_at: session.last_seen_at,
            expires_at: session.expires_at,
            revoked_at: session.revoked_at,
            revoked_reason: session.revoked_reason.clone(),
            status,
            is_active: status == SessionStatus::Active,
            is_current: current == Some(session.id),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionView>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct RevokeRequest {
    #[validate(length(max = 255))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevokeResponse {
    pub revoked: bool,
    /// The session had already been revoked; its original reason is kept.
    pub already_revoked: bool,
    /// The caller revoked the session it is using and should drop its token.
    pub current_session_revoked: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct RevokeAllRequest {
    #[validate(length(max = 255))]
    pub reason: Option<String>,
    /// Spare the session that authenticated this request.
    #[serde(default)]
    pub keep_current: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevokeAllResponse {
    pub revoked_count: u64,
    pub current_session_revoked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Fingerprint;
    use chrono::Duration;

    #[test]
    fn view_marks_current_and_status() {
        let now = Utc::now();
        let session = Session::new(
            Uuid::new_v4(),
            None,
            Role::Member,
            Fingerprint::unknown(),
            "token",
            now,
            Duration::hours(1),
        );

        let view = SessionView::from_session(&session, now, Some(session.id));
        assert!(view.is_current);
        assert!(view.is_active);
        assert_eq!(view.status, SessionStatus::Active);

        let later = SessionView::from_session(&session, now + Duration::hours(2), None);
        assert!(!later.is_current);
        assert!(!later.is_active);
        assert_eq!(later.status, SessionStatus::Expired);
    }

    #[test]
    fn reason_longer_than_255_is_rejected() {
        let req = RevokeRequest {
            reason: Some("x".repeat(256)),
        };
        assert!(req.validate().is_err());
        assert!(RevokeRequest::default().validate().is_ok());
    }
}
