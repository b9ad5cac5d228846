//! Relay server implementation

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use relay_auth::ImpersonatedCredentialProvider;
use relay_core::{PathMatcher, RelayConfig, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::info;

use crate::events::{EventRouter, PubSubPublisher};
use crate::metrics::{metrics_middleware, MetricsRecorder};
use crate::routes;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<EventRouter>,
    pub metrics: Option<Arc<MetricsRecorder>>,
    pub start_time: Instant,
}

/// Relay server
pub struct RelayServer {
    config: RelayConfig,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let start_time = Instant::now();

        self.config.validate()?;

        let metrics = if self.config.server.metrics_enabled {
            let metrics = Arc::new(MetricsRecorder::install()?);
            info!("Prometheus metrics initialized");
            Some(metrics)
        } else {
            None
        };

        let http = relay_auth::http_client(Duration::from_secs(
            self.config.endpoints.request_timeout_secs,
        ))?;

        let matcher = PathMatcher::new(&self.config.routing.csv_pattern)?;
        let credentials = ImpersonatedCredentialProvider::from_config(&self.config, http.clone());
        let publisher = PubSubPublisher::new(http, self.config.endpoints.pubsub.clone());
        let router = EventRouter::new(
            matcher,
            self.config.routing.topic_path(),
            Arc::new(credentials),
            Arc::new(publisher),
        );

        info!(
            "Routing objects matching {} to {} as {}",
            self.config.routing.csv_pattern,
            router.topic(),
            self.config.credentials.impersonate_service_account
        );

        let state = AppState {
            router: Arc::new(router),
            metrics,
            start_time,
        };

        let app = create_router(state);
        let addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );

        let listener = TcpListener::bind(&addr).await?;
        info!("Bucket relay listening on http://{}", addr);
        if self.config.server.metrics_enabled {
            info!("Prometheus metrics at http://{}/metrics", addr);
        }

        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Build the HTTP router for a prepared state
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", post(routes::receive_event))
        .route("/healthz", get(routes::health))
        .route("/metrics", get(routes::metrics_handler));

    if let Some(metrics) = state.metrics.clone() {
        router = router.layer(middleware::from_fn_with_state(metrics, metrics_middleware));
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .with_state(state)
}
