pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use metrics_exporter_prometheus::PrometheusHandle;
use service_core::axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::SessionServiceConfig;
use crate::services::{
    Clock, RevocationAuthority, SessionLifecycle, SessionPolicy, SessionQueryService,
    SessionStore,
};
use service_core::error::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::sessions::create_session,
        handlers::sessions::list_my_sessions,
        handlers::sessions::my_session_stats,
        handlers::sessions::revoke_session,
        handlers::sessions::revoke_all_my_sessions,
        handlers::admin::list_principal_sessions,
        handlers::admin::principal_session_stats,
        handlers::admin::revoke_principal_sessions,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::session::CreateSessionRequest,
            dtos::session::CreateSessionResponse,
            dtos::session::SessionView,
            dtos::session::SessionListResponse,
            dtos::session::RevokeRequest,
            dtos::session::RevokeResponse,
            dtos::session::RevokeAllRequest,
            dtos::session::RevokeAllResponse,
            services::SessionStats,
            models::Role,
            models::SessionStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Sessions", description = "Session creation, listing and revocation"),
        (name = "Admin", description = "Administrative session management"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("opaque")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "internal_api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    middleware::INTERNAL_API_KEY_HEADER,
                ))),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: SessionServiceConfig,
    pub store: Arc<dyn SessionStore>,
    pub clock: Arc<dyn Clock>,
    pub lifecycle: SessionLifecycle,
    pub queries: SessionQueryService,
    pub metrics: Option<PrometheusHandle>,
    pub create_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire every session component to the same store and clock.
    pub fn new(
        config: SessionServiceConfig,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let policy = SessionPolicy {
            ttl: config.session_ttl(),
            max_sessions_per_principal: config.session.max_per_principal,
        };
        let authority = RevocationAuthority::new(store.clone(), clock.clone());
        let lifecycle = SessionLifecycle::new(store.clone(), clock.clone(), authority, policy);
        let queries = SessionQueryService::new(store.clone(), clock.clone());
        let create_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.create_attempts,
            config.rate_limit.create_window_seconds,
        );

        Self {
            config,
            store,
            clock,
            lifecycle,
            queries,
            metrics,
            create_rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Internal: called by the login flow only
    let create_route = Router::new()
        .route("/sessions", post(handlers::sessions::create_session))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::internal_api_key_middleware,
        ));

    let session_routes = Router::new()
        .route("/sessions/mine", get(handlers::sessions::list_my_sessions))
        .route(
            "/sessions/mine/stats",
            get(handlers::sessions::my_session_stats),
        )
        .route(
            "/sessions/mine/revoke-all",
            post(handlers::sessions::revoke_all_my_sessions),
        )
        .route(
            "/sessions/:id/revoke",
            post(handlers::sessions::revoke_session),
        )
        .route(
            "/admin/principals/:id/sessions",
            get(handlers::admin::list_principal_sessions),
        )
        .route(
            "/admin/principals/:id/sessions/stats",
            get(handlers::admin::principal_session_stats),
        )
        .route(
            "/admin/principals/:id/sessions/revoke-all",
            post(handlers::admin::revoke_principal_sessions),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                        None
                    }
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middleware::INTERNAL_API_KEY_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_credentials(false);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(create_route)
        .merge(session_routes)
        .with_state(state)
        // Add metrics middleware
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        // Add security headers middleware
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Session store health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "session_store": "up"
        }
    })))
}
