//! Prometheus metrics for Bucket Relay
//!
//! Exposes metrics at `/metrics` endpoint in Prometheus format.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use relay_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::events::RouteOutcome;

/// Metric names
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "relay_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "relay_http_request_duration_seconds";

    // Event metrics
    pub const EVENTS_RECEIVED_TOTAL: &str = "relay_events_received_total";
    pub const EVENTS_UNMATCHED_TOTAL: &str = "relay_events_unmatched_total";
    pub const EVENT_FAILURES_TOTAL: &str = "relay_event_failures_total";
    pub const MESSAGES_PUBLISHED_TOTAL: &str = "relay_messages_published_total";
    pub const PUBLISH_DURATION_SECONDS: &str = "relay_publish_duration_seconds";

    // System metrics
    pub const UPTIME_SECONDS: &str = "relay_uptime_seconds";
    pub const INFO: &str = "relay_info";
}

/// Metrics recorder
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
    start_time: Instant,
}

impl MetricsRecorder {
    /// Install the process-wide Prometheus recorder
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            Error::Configuration(format!("failed to install Prometheus recorder: {}", e))
        })?;

        gauge!(names::INFO, "version" => relay_core::VERSION).set(1.0);

        Ok(Self {
            handle,
            start_time: Instant::now(),
        })
    }

    /// Get metrics output in Prometheus format
    pub fn render(&self) -> String {
        gauge!(names::UPTIME_SECONDS).set(self.start_time.elapsed().as_secs_f64());

        self.handle.render()
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, status: u16, duration_secs: f64) {
        let status_class = format!("{}xx", status / 100);

        counter!(
            names::HTTP_REQUESTS_TOTAL,
            "method" => method.to_string(),
            "status" => status.to_string(),
            "status_class" => status_class
        )
        .increment(1);

        histogram!(
            names::HTTP_REQUEST_DURATION_SECONDS,
            "method" => method.to_string()
        )
        .record(duration_secs);
    }

    /// Record the outcome of one storage event
    ///
    /// Publish latency is recorded by the router around the bus call itself.
    pub fn record_event(&self, outcome: &Result<RouteOutcome>) {
        counter!(names::EVENTS_RECEIVED_TOTAL).increment(1);

        match outcome {
            Ok(RouteOutcome::Published { .. }) => {
                counter!(names::MESSAGES_PUBLISHED_TOTAL).increment(1);
            }
            Ok(RouteOutcome::Unmatched { .. }) => {
                counter!(names::EVENTS_UNMATCHED_TOTAL).increment(1);
            }
            Err(err) => {
                counter!(names::EVENT_FAILURES_TOTAL, "code" => err.code()).increment(1);
            }
        }
    }
}

/// Axum middleware for recording HTTP metrics
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRecorder>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    metrics.record_http_request(&method, status, duration);

    debug!(
        method = %method,
        path = %path,
        status = %status,
        duration_ms = %(duration * 1000.0),
        "Request completed"
    );

    response
}
