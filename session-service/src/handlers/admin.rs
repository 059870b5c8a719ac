//! Administrative reads and bulk revocation for another principal's sessions.
//! Authorization is the revocation rule: the principal themselves, an admin
//! of the principal's tenant, or a platform admin.

use service_core::{
    axum::{
        extract::{Path, State},
        response::IntoResponse,
        Json,
    },
    error::AppError,
};
use uuid::Uuid;

use crate::{
    dtos::session::{RevokeAllRequest, RevokeAllResponse, SessionListResponse, SessionView},
    middleware::CurrentSession,
    utils::OptionalValidatedJson,
    AppState,
};

/// List a principal's sessions
#[utoipa::path(
    get,
    path = "/admin/principals/{id}/sessions",
    params(
        ("id" = Uuid, Path, description = "Principal ID")
    ),
    responses(
        (status = 200, description = "Sessions of the principal", body = SessionListResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not permitted to manage this session", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_principal_sessions(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(principal_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state
        .queries
        .list_sessions_for(principal_id, &current.actor())
        .await?;

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

/// Session statistics for a principal
#[utoipa::path(
    get,
    path = "/admin/principals/{id}/sessions/stats",
    params(
        ("id" = Uuid, Path, description = "Principal ID")
    ),
    responses(
        (status = 200, description = "Session statistics", body = SessionStats),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not permitted to manage this session", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn principal_session_stats(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(principal_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state
        .queries
        .stats_for(principal_id, &current.actor())
        .await?;
    Ok(Json(stats))
}

/// Revoke every active session of a principal
#[utoipa::path(
    post,
    path = "/admin/principals/{id}/sessions/revoke-all",
    params(
        ("id" = Uuid, Path, description = "Principal ID")
    ),
    request_body(content = Option<RevokeAllRequest>, description = "Optional reason"),
    responses(
        (status = 200, description = "Sessions revoked", body = RevokeAllResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not permitted to manage this session", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn revoke_principal_sessions(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(principal_id): Path<Uuid>,
    OptionalValidatedJson(req): OptionalValidatedJson<RevokeAllRequest>,
) -> Result<impl IntoResponse, AppError> {
    let req = req.unwrap_or_default();
    let keep = req.keep_current.then(|| current.id());

    let revoked_count = state
        .lifecycle
        .revoke_all(principal_id, &current.actor(), req.reason.as_deref(), keep)
        .await?;

    Ok(Json(RevokeAllResponse {
        revoked_count,
        current_session_revoked: principal_id == current.0.principal_id && !req.keep_current,
    }))
}
