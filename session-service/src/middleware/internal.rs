use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use secrecy::ExposeSecret;
use serde_json::json;
use subtle::ConstantTimeEq;

pub const INTERNAL_API_KEY_HEADER: &str = "x-internal-api-key";

/// Guards `POST /sessions`: only the login flow holds the shared key.
pub async fn internal_api_key_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let api_key = headers
        .get(INTERNAL_API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    let expected = state.config.security.internal_api_key.expose_secret();

    match api_key {
        Some(key) if bool::from(key.as_bytes().ct_eq(expected.as_bytes())) => {
            next.run(request).await
        }
        _ => {
            tracing::warn!("Failed internal API key authentication attempt");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized: Invalid or missing internal API key" })),
            )
                .into_response()
        }
    }
}
