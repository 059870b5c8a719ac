use service_core::{
    axum::{extract::State, response::IntoResponse},
    error::AppError,
};

use crate::AppState;

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(AppError::ServiceUnavailable)
}
