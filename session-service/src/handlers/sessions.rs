use service_core::{
    axum::{
        extract::{ConnectInfo, Path, State},
        http::{header, HeaderMap, StatusCode},
        response::IntoResponse,
        Json,
    },
    error::AppError,
    middleware::rate_limit::check_ip_rate_limit,
};
use std::net::SocketAddr;
use uuid::Uuid;

use crate::{
    dtos::session::{
        CreateSessionRequest, CreateSessionResponse, RevokeAllRequest, RevokeAllResponse,
        RevokeRequest, RevokeResponse, SessionListResponse, SessionView,
    },
    middleware::CurrentSession,
    services::{RequestContext, RevokeOutcome},
    utils::{OptionalValidatedJson, ValidatedJson},
    AppState,
};

/// Build the fingerprint input. Values forwarded in the body take precedence
/// over what this hop sees, since the caller is the login flow, not the
/// end user.
fn request_context(
    req: &CreateSessionRequest,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> RequestContext {
    let user_agent = req.user_agent.clone().or_else(|| {
        headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let remote_addr = req
        .ip_address
        .clone()
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(|s| s.trim().to_string())
        })
        .or_else(|| peer.map(|addr| addr.to_string()));

    RequestContext::new(user_agent, remote_addr)
}

/// Create a session for a principal the login flow has just authenticated
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = CreateSessionResponse),
        (status = 401, description = "Missing or invalid internal API key", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(
        ("internal_api_key" = [])
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let context = request_context(&req, &headers, connect_info.map(|ConnectInfo(addr)| addr));

    // Keyed on the end user, not on the login flow calling us.
    match context.client_ip() {
        Some(ip) => check_ip_rate_limit(&state.create_rate_limiter, ip)?,
        None => tracing::warn!("Could not determine IP for rate limiting"),
    }

    let issued = state
        .lifecycle
        .create_session(
            req.principal_id,
            req.tenant_id,
            req.role.unwrap_or_default(),
            &context,
        )
        .await?;

    let view = SessionView::from_session(&issued.session, issued.session.created_at, None);
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session: view,
            token: issued.token,
        }),
    ))
}

/// List the caller's sessions, newest first
#[utoipa::path(
    get,
    path = "/sessions/mine",
    responses(
        (status = 200, description = "Sessions of the authenticated principal", body = SessionListResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_my_sessions(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.queries.list_sessions(current.0.principal_id).await?;

    let sessions: Vec<SessionView> = snapshot
        .sessions
        .iter()
        .map(|s| SessionView::from_session(s, snapshot.as_of, Some(current.id())))
        .collect();

    Ok(Json(SessionListResponse {
        total: sessions.len(),
        sessions,
    }))
}

/// Session statistics for the caller
#[utoipa::path(
    get,
    path = "/sessions/mine/stats",
    responses(
        (status = 200, description = "Session statistics", body = SessionStats),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn my_session_stats(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.queries.compute_stats(current.0.principal_id).await?;
    Ok(Json(stats))
}

/// Revoke a session
#[utoipa::path(
    post,
    path = "/sessions/{id}/revoke",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    request_body(content = Option<RevokeRequest>, description = "Optional revocation reason"),
    responses(
        (status = 200, description = "Session revoked (or already revoked)", body = RevokeResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not permitted to manage this session", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn revoke_session(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(session_id): Path<Uuid>,
    OptionalValidatedJson(req): OptionalValidatedJson<RevokeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reason = req.and_then(|r| r.reason);

    let outcome = state
        .lifecycle
        .revoke(session_id, &current.actor(), reason.as_deref())
        .await?;

    Ok(Json(RevokeResponse {
        revoked: true,
        already_revoked: outcome == RevokeOutcome::AlreadyRevoked,
        current_session_revoked: session_id == current.id(),
    }))
}

/// Revoke all of the caller's active sessions ("log out everywhere")
#[utoipa::path(
    post,
    path = "/sessions/mine/revoke-all",
    request_body(content = Option<RevokeAllRequest>, description = "Optional reason and keep_current flag"),
    responses(
        (status = 200, description = "Sessions revoked", body = RevokeAllResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn revoke_all_my_sessions(
    State(state): State<AppState>,
    current: CurrentSession,
    OptionalValidatedJson(req): OptionalValidatedJson<RevokeAllRequest>,
) -> Result<impl IntoResponse, AppError> {
    let req = req.unwrap_or_default();
    let keep = req.keep_current.then(|| current.id());

    let revoked_count = state
        .lifecycle
        .revoke_all(
            current.0.principal_id,
            &current.actor(),
            req.reason.as_deref(),
            keep,
        )
        .await?;

    Ok(Json(RevokeAllResponse {
        revoked_count,
        current_session_revoked: !req.keep_current,
    }))
}
