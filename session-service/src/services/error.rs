use service_core::error::AppError;
use thiserror::Error;

/// Why a token failed validation. Logged, never returned to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    Missing,
    Unknown,
    Expired,
    Revoked,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::Missing => "missing",
            InvalidReason::Unknown => "unknown",
            InvalidReason::Expired => "expired",
            InvalidReason::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session invalid ({0})")]
    SessionInvalid(InvalidReason),

    #[error("Session not found")]
    NotFound,

    #[error("Not permitted to manage this session")]
    Forbidden,

    #[error("Session store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            // Expired, revoked and unknown tokens look identical to the caller.
            SessionError::SessionInvalid(_) => {
                AppError::Unauthorized(anyhow::anyhow!("Not authenticated"))
            }
            SessionError::NotFound => AppError::NotFound(anyhow::anyhow!("Session not found")),
            SessionError::Forbidden => AppError::Forbidden(anyhow::anyhow!(
                "Not permitted to manage this session"
            )),
            SessionError::Store(e) => AppError::DatabaseError(e),
        }
    }
}
