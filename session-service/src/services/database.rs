//! PostgreSQL session store.
//!
//! Uses sqlx runtime queries against the `user_sessions` table created by
//! `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, FromRow};
use uuid::Uuid;

use super::store::SessionStore;
use crate::models::{Role, Session};

/// Row shape of `user_sessions`.
#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    principal_id: Uuid,
    tenant_id: Option<Uuid>,
    role_code: String,
    device_name: String,
    browser: String,
    os: String,
    ip_address: String,
    token_hash: String,
    created_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_reason: Option<String>,
}

impl TryFrom<SessionRow> for Session {
    type Error = anyhow::Error;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role_code
            .parse()
            .map_err(|e: String| anyhow::anyhow!("session {}: {}", row.id, e))?;

        Ok(Session {
            id: row.id,
            principal_id: row.principal_id,
            tenant_id: row.tenant_id,
            role,
            device_name: row.device_name,
            browser: row.browser,
            os: row.os,
            ip_address: row.ip_address,
            token_hash: row.token_hash,
            created_at: row.created_at,
            last_seen_at: row.last_seen_at,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            revoked_reason: row.revoked_reason,
        })
    }
}

/// PostgreSQL-backed [`SessionStore`].
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &Session) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (
                id, principal_id, tenant_id, role_code, device_name, browser, os,
                ip_address, token_hash, created_at, last_seen_at, expires_at,
                revoked_at, revoked_reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(session.id)
        .bind(session.principal_id)
        .bind(session.tenant_id)
        .bind(session.role.as_code())
        .bind(&session.device_name)
        .bind(&session.browser)
        .bind(&session.os)
        .bind(&session.ip_address)
        .bind(&session.token_hash)
        .bind(session.created_at)
        .bind(session.last_seen_at)
        .bind(session.expires_at)
        .bind(session.revoked_at)
        .bind(&session.revoked_reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<Session>, anyhow::Error> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM user_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Session::try_from)
            .transpose()
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, anyhow::Error> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM user_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?
            .map(Session::try_from)
            .transpose()
    }

    async fn list_by_principal(&self, principal_id: Uuid) -> Result<Vec<Session>, anyhow::Error> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM user_sessions WHERE principal_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Session::try_from)
        .collect()
    }

    async fn touch(&self, session_id: Uuid, seen_at: DateTime<Utc>) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions
            SET last_seen_at = GREATEST(last_seen_at, $2)
            WHERE id = $1 AND revoked_at IS NULL AND expires_at > $2
            "#,
        )
        .bind(session_id)
        .bind(seen_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_revoked(
        &self,
        session_id: Uuid,
        revoked_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions
            SET revoked_at = $2, revoked_reason = $3
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(session_id)
        .bind(revoked_at)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn purge_ended_before(&self, cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_sessions
            WHERE LEAST(COALESCE(revoked_at, expires_at), expires_at) < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                anyhow::anyhow!("Database health check failed: {}", e)
            })?;
        Ok(())
    }
}
