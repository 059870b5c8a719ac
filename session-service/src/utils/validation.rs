use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::dtos::ErrorResponse;

pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            let err_resp = ErrorResponse {
                error: format!("Json parse error: {}", e),
            };
            (StatusCode::BAD_REQUEST, Json(err_resp)).into_response()
        })?;

        validate(&value)?;
        Ok(ValidatedJson(value))
    }
}

/// Like [`ValidatedJson`], but an empty body yields `None`. For endpoints
/// whose body is entirely optional, such as revoke with no reason.
pub struct OptionalValidatedJson<T>(pub Option<T>);

#[axum::async_trait]
impl<T, S> FromRequest<S> for OptionalValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalValidatedJson(None));
        }

        let value: T = serde_json::from_slice(&body).map_err(|e| {
            let err_resp = ErrorResponse {
                error: format!("Json parse error: {}", e),
            };
            (StatusCode::BAD_REQUEST, Json(err_resp)).into_response()
        })?;

        validate(&value)?;
        Ok(OptionalValidatedJson(Some(value)))
    }
}

fn validate<T: Validate>(value: &T) -> Result<(), Response> {
    value.validate().map_err(|e| {
        let err_resp = ErrorResponse {
            error: format!("Validation error: {}", e),
        };
        (StatusCode::UNPROCESSABLE_ENTITY, Json(err_resp)).into_response()
    })
}
