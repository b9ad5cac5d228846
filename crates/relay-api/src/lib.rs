//! Event intake and publishing for Bucket Relay

pub mod events;
pub mod metrics;
pub mod routes;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{EventRouter, PubSubPublisher, Publisher, RouteOutcome};
pub use metrics::MetricsRecorder;
pub use server::{AppState, RelayServer};
