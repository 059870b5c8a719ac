use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;

/// Install the global Prometheus recorder and describe the session metrics.
pub fn init_metrics() -> Result<PrometheusHandle, AppError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        tracing::error!("Failed to install Prometheus recorder: {}", e);
        AppError::ConfigError(anyhow::anyhow!("Failed to initialize metrics: {}", e))
    })?;

    metrics::describe_counter!("sessions_created_total", "Sessions created at login");
    metrics::describe_counter!(
        "session_validations_total",
        "Session token validations by outcome"
    );
    metrics::describe_counter!("sessions_revoked_total", "Sessions revoked by kind");
    metrics::describe_counter!(
        "sessions_evicted_total",
        "Sessions revoked by the per-principal session limit"
    );
    metrics::describe_counter!("sessions_purged_total", "Sessions deleted by retention");
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    Ok(handle)
}
