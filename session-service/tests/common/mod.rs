//! Test helper module for session-service integration tests.
//!
//! Builds the full router over the in-memory store and a manual clock, so
//! tests can drive time forward without sleeping.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::Value;
use session_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, RateLimitConfig, SecurityConfig, SessionConfig,
        SessionServiceConfig,
    },
    models::{Actor, Role},
    services::{
        Clock, InMemorySessionStore, IssuedSession, ManualClock, RequestContext,
        SessionLifecycle, SessionQueryService,
    },
    AppState,
};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_INTERNAL_API_KEY: &str = "test-internal-key-12345";

pub const CHROME_ON_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const SAFARI_ON_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn test_config() -> SessionServiceConfig {
    SessionServiceConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "session-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://localhost/sessions_test".to_string(),
            max_connections: 5,
            min_connections: 1,
        },
        session: SessionConfig {
            ttl_hours: 24,
            max_per_principal: 0,
            retention_days: 0,
            reaper_interval_seconds: 3600,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            internal_api_key: Secret::new(TEST_INTERNAL_API_KEY.to_string()),
        },
        rate_limit: RateLimitConfig {
            create_attempts: 100,
            create_window_seconds: 60,
        },
    }
}

/// Test application wired to in-memory collaborators.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemorySessionStore>,
    pub clock: Arc<ManualClock>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: SessionServiceConfig) -> Self {
        let store = Arc::new(InMemorySessionStore::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let state = AppState::new(config, store.clone(), clock.clone(), None);
        let router = build_router(state.clone());

        Self {
            state,
            store,
            clock,
            router,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.state.lifecycle
    }

    pub fn queries(&self) -> &SessionQueryService {
        &self.state.queries
    }

    /// Create a session directly through the lifecycle manager.
    pub async fn login(&self, principal_id: Uuid, tenant_id: Option<Uuid>, role: Role) -> IssuedSession {
        self.login_from(principal_id, tenant_id, role, CHROME_ON_WINDOWS)
            .await
    }

    pub async fn login_from(
        &self,
        principal_id: Uuid,
        tenant_id: Option<Uuid>,
        role: Role,
        user_agent: &str,
    ) -> IssuedSession {
        self.lifecycle()
            .create_session(
                principal_id,
                tenant_id,
                role,
                &RequestContext::new(
                    Some(user_agent.to_string()),
                    Some("203.0.113.10:443".to_string()),
                ),
            )
            .await
            .expect("Failed to create session")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_empty(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

pub fn member(principal_id: Uuid, tenant_id: Option<Uuid>) -> Actor {
    Actor::new(principal_id, tenant_id, Role::Member)
}

pub fn admin(tenant_id: Option<Uuid>) -> Actor {
    Actor::new(Uuid::new_v4(), tenant_id, Role::Admin)
}
