//! Actor - the principal performing a revoke or an administrative read.

use uuid::Uuid;

use super::{Role, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub principal_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
}

impl Actor {
    pub fn new(principal_id: Uuid, tenant_id: Option<Uuid>, role: Role) -> Self {
        Self {
            principal_id,
            tenant_id,
            role,
        }
    }

    /// The identity behind an authenticated request.
    pub fn from_session(session: &Session) -> Self {
        Self::new(session.principal_id, session.tenant_id, session.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admin without a tenant: scope is the whole platform.
    pub fn is_platform_admin(&self) -> bool {
        self.is_admin() && self.tenant_id.is_none()
    }
}
