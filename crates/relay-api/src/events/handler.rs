//! Storage event handler
//!
//! One call per notification. A matching object yields exactly one
//! published message; anything else is logged and acknowledged.

use relay_auth::CredentialProvider;
use relay_core::types::{OutboundMessage, StorageEvent};
use metrics::histogram;
use relay_core::{normalize_object_path, PathMatcher, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::publisher::Publisher;
use crate::metrics::names;

/// Terminal state of a successful invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    Published {
        message_id: String,
        dataset_name: String,
        table_name: String,
    },
    Unmatched {
        object_path: String,
    },
}

/// Routes storage events to the configured topic
pub struct EventRouter {
    matcher: PathMatcher,
    topic: String,
    credentials: Arc<dyn CredentialProvider>,
    publisher: Arc<dyn Publisher>,
}

impl EventRouter {
    pub fn new(
        matcher: PathMatcher,
        topic: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            matcher,
            topic: topic.into(),
            credentials,
            publisher,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Path pattern the router matches against
    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    /// Handle one storage notification
    pub async fn handle(&self, event: &StorageEvent) -> Result<RouteOutcome> {
        info!("Event type: {}", event.event_type);
        info!("Event timestamp: {}", event.timestamp);

        let resource_name = normalize_object_path(&event.object_path);

        let Some(path_match) = self.matcher.match_path(resource_name) else {
            warn!("Failed regex match for resource: {}", resource_name);
            return Ok(RouteOutcome::Unmatched {
                object_path: resource_name.to_string(),
            });
        };

        let message = OutboundMessage::csv(&event.bucket, resource_name, &path_match);

        let credential = self.credentials.delegated_credential().await.map_err(|e| {
            error!(
                resource = %resource_name,
                bucket = %event.bucket,
                "Failed to obtain publishing credential: {}",
                e
            );
            e
        })?;

        let publish_start = Instant::now();
        let message_id = self
            .publisher
            .publish(&self.topic, &message, &credential)
            .await
            .map_err(|e| {
                error!(
                    resource = %resource_name,
                    bucket = %event.bucket,
                    "An error occurred when trying to publish message: {}",
                    e
                );
                e
            })?;
        histogram!(names::PUBLISH_DURATION_SECONDS).record(publish_start.elapsed().as_secs_f64());

        info!(
            message_id = %message_id,
            dataset = %message.dataset_name,
            table = %message.table_name,
            "Published message for resource {} in bucket {}",
            resource_name,
            event.bucket
        );

        Ok(RouteOutcome::Published {
            message_id,
            dataset_name: message.dataset_name,
            table_name: message.table_name,
        })
    }
}
