use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::{
    models::{Actor, Session},
    AppState,
};

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "session_token";

/// Bearer token first, then the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_string())
        })
}

/// Validate the presented session and record activity. Every failure cause
/// produces the same 401 body.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(req.headers()).unwrap_or_default();

    let session = state.lifecycle.validate_and_touch(&token).await?;

    req.extensions_mut().insert(CurrentSession(session));

    Ok(next.run(req).await)
}

/// The session that authenticated the current request.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl CurrentSession {
    pub fn id(&self) -> uuid::Uuid {
        self.0.id
    }

    pub fn actor(&self) -> Actor {
        Actor::from_session(&self.0)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Not authenticated")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session_token=def"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_token=def"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("def"));
    }

    #[test]
    fn no_credentials() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
