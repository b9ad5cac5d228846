//! HTTP routes

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use relay_core::{
    error::ErrorResponse,
    types::{CloudEventAttributes, StorageEvent},
    utils::generate_request_id,
    Error,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::server::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn cloud_event_attributes(headers: &HeaderMap) -> CloudEventAttributes {
    CloudEventAttributes {
        id: header_value(headers, "ce-id"),
        event_type: header_value(headers, "ce-type"),
        time: header_value(headers, "ce-time"),
    }
}

fn error_response(err: Error, resource: Option<&str>, request_id: &str) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = ErrorResponse::from(err).with_request_id(request_id);
    if let Some(resource) = resource {
        body = body.with_resource(resource);
    }

    (status, [(REQUEST_ID_HEADER, request_id.to_string())], Json(body)).into_response()
}

fn success_response<T: Serialize>(body: T, request_id: &str) -> Response {
    (
        StatusCode::OK,
        [(REQUEST_ID_HEADER, request_id.to_string())],
        Json(body),
    )
        .into_response()
}

/// Storage notification intake
///
/// Unmatched objects are acknowledged with 200 so the platform does not
/// redeliver them. Malformed events answer 400; every other failure answers
/// 500 and fails the invocation.
pub async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = generate_request_id();

    let attributes = cloud_event_attributes(&headers);
    let parsed = if attributes.is_present() {
        StorageEvent::from_cloud_event(&attributes, &body)
    } else {
        StorageEvent::from_json(&body)
    };

    let (resource, result) = match parsed {
        Ok(event) => {
            debug!(
                request_id = %request_id,
                event_id = ?event.event_id,
                "Received event for gs://{}/{}",
                event.bucket,
                event.object_path
            );
            let result = state.router.handle(&event).await;
            (Some(event.object_path), result)
        }
        Err(err) => {
            warn!(request_id = %request_id, "Rejected event: {}", err);
            (None, Err(err))
        }
    };

    if let Some(metrics) = &state.metrics {
        metrics.record_event(&result);
    }

    match result {
        Ok(outcome) => success_response(outcome, &request_id),
        Err(err) => error_response(err, resource.as_deref(), &request_id),
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    topic: String,
    pattern: String,
    uptime_secs: u64,
}

/// Liveness probe
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: relay_core::VERSION,
        topic: state.router.topic().to_string(),
        pattern: state.router.pattern().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Handler for /metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(metrics) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            metrics.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
