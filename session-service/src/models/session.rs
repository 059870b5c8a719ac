//! Session model - one authenticated login on one device.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::fingerprint::Fingerprint;

/// Role asserted by the authentication collaborator at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn as_code(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Derived classification. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Expired,
    Revoked,
}

/// Session entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
    pub device_name: String,
    pub browser: String,
    pub os: String,
    pub ip_address: String,
    /// SHA-256 of the bearer token; the raw token is never stored.
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
}

impl Session {
    /// Create a new session starting at `now` with a fixed lifetime of `ttl`.
    pub fn new(
        principal_id: Uuid,
        tenant_id: Option<Uuid>,
        role: Role,
        fingerprint: Fingerprint,
        token: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            principal_id,
            tenant_id,
            role,
            device_name: fingerprint.device_name,
            browser: fingerprint.browser,
            os: fingerprint.os,
            ip_address: fingerprint.ip_address,
            token_hash: Self::hash_token(token),
            created_at: now,
            last_seen_at: now,
            expires_at: now + ttl,
            revoked_at: None,
            revoked_reason: None,
        }
    }

    /// Hash a token using SHA-256
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Revocation wins over expiry so the audit reason stays visible.
    pub fn status_at(&self, now: DateTime<Utc>) -> SessionStatus {
        if self.revoked_at.is_some() {
            SessionStatus::Revoked
        } else if now >= self.expires_at {
            SessionStatus::Expired
        } else {
            SessionStatus::Active
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == SessionStatus::Active
    }

    /// Instant the session stopped being usable (revocation or expiry,
    /// whichever came first). In the future for live sessions.
    pub fn ended_at(&self) -> DateTime<Utc> {
        match self.revoked_at {
            Some(revoked_at) if revoked_at < self.expires_at => revoked_at,
            _ => self.expires_at,
        }
    }
}
