//! Prometheus Metrics
//!
//! # Metrics
//!
//! - `rewards_http_requests_total` - requests by method, path, status
//! - `rewards_http_request_duration_seconds` - request duration
//! - `rewards_active_requests` - requests in flight
//! - `rewards_uptime_seconds` - service uptime
//!
//! Domain counters (`rewards_payout_items_total`, `rewards_submissions_total`)
//! are recorded by the engine.
//!
//! # Configuration
//!
//! - `REWARDS_METRICS_ENABLED`: enable metrics (default: true)
//! - `REWARDS_METRICS_PORT`: exporter port (default: 9090)

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::state::AppState;

/// Metrics configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
        }
    }
}

impl MetricsConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let enabled = std::env::var("REWARDS_METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);

        let port = std::env::var("REWARDS_METRICS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(9090);

        Self { enabled, port }
    }
}

/// Install the Prometheus exporter; call once at startup
pub fn init_metrics(config: &MetricsConfig) -> Result<(), String> {
    if !config.enabled {
        tracing::info!("Metrics disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install metrics recorder: {}", e))?;

    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Record a request metric
pub fn record_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", normalize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("rewards_http_requests_total", &labels).increment(1);
    histogram!("rewards_http_request_duration_seconds", &labels).record(duration_secs);
}

/// Replace id segments with `:id` so label cardinality stays bounded
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|part| {
            let numeric = !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
            let uuid_like = part.len() >= 8 && part.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
            if numeric || uuid_like {
                ":id"
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Metrics middleware for tracking HTTP requests
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    gauge!("rewards_active_requests").set(state.request_started() as f64);
    gauge!("rewards_uptime_seconds").set(state.uptime_secs() as f64);

    let response = next.run(request).await;

    record_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());
    gauge!("rewards_active_requests").set(state.request_finished() as f64);

    response
}
