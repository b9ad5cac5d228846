//! Message bus publisher
//!
//! Delivers outbound messages to a Pub/Sub topic through the REST API and
//! waits for the server to acknowledge them.

use async_trait::async_trait;
use base64::Engine;
use relay_auth::DelegatedCredential;
use relay_core::types::OutboundMessage;
use relay_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Publishes one message and returns the id assigned by the bus
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        message: &OutboundMessage,
        credential: &DelegatedCredential,
    ) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct PublishRequest {
    messages: Vec<PubsubMessage>,
}

#[derive(Debug, Serialize)]
struct PubsubMessage {
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

/// Pub/Sub REST publisher
#[derive(Clone)]
pub struct PubSubPublisher {
    http: Client,
    base_url: String,
}

impl PubSubPublisher {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn publish_url(&self, topic: &str) -> String {
        format!("{}/v1/{}:publish", self.base_url.trim_end_matches('/'), topic)
    }
}

#[async_trait]
impl Publisher for PubSubPublisher {
    async fn publish(
        &self,
        topic: &str,
        message: &OutboundMessage,
        credential: &DelegatedCredential,
    ) -> Result<String> {
        let data = message.to_bytes()?;
        let request = PublishRequest {
            messages: vec![PubsubMessage {
                data: base64::engine::general_purpose::STANDARD.encode(data),
            }],
        };

        debug!("Publishing {} to {}", message.file_name, topic);

        let response = self
            .http
            .post(self.publish_url(topic))
            .header("Authorization", credential.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Publish(format!("request to {} failed: {}", topic, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Publish(format!(
                "{} rejected message: {} {}",
                topic, status, detail
            )));
        }

        let ack: PublishResponse = response
            .json()
            .await
            .map_err(|e| Error::Publish(format!("malformed publish response: {}", e)))?;

        ack.message_ids
            .into_iter()
            .next()
            .ok_or_else(|| Error::Publish(format!("{} acknowledged no message", topic)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_server;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use chrono::{Duration, Utc};
    use relay_auth::AccessToken;
    use relay_core::PathMatch;

    async fn publish_handler(
        Path(rest): Path<String>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> std::result::Result<Json<serde_json::Value>, (StatusCode, &'static str)> {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer delegated") {
            return Err((StatusCode::UNAUTHORIZED, "unauthenticated"));
        }
        match rest.as_str() {
            "projects/p1/topics/csv-arrivals:publish" => {
                let data = body["messages"][0]["data"].as_str().unwrap_or_default();
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(data)
                    .map_err(|_| (StatusCode::BAD_REQUEST, "bad data"))?;
                let message: OutboundMessage = serde_json::from_slice(&decoded)
                    .map_err(|_| (StatusCode::BAD_REQUEST, "bad message"))?;
                if message.kind != "csv" {
                    return Err((StatusCode::BAD_REQUEST, "unexpected type"));
                }
                Ok(Json(serde_json::json!({ "messageIds": ["4242"] })))
            }
            "projects/p1/topics/silent:publish" => Ok(Json(serde_json::json!({}))),
            _ => Err((StatusCode::NOT_FOUND, "Resource not found (resource=topic)")),
        }
    }

    fn credential(token: &str) -> DelegatedCredential {
        DelegatedCredential {
            service_account: "publisher@p1.iam.gserviceaccount.com".into(),
            scopes: vec!["https://www.googleapis.com/auth/pubsub".into()],
            access_token: AccessToken::new(token, Utc::now() + Duration::seconds(600)),
        }
    }

    fn message() -> OutboundMessage {
        OutboundMessage::csv(
            "acep-drop",
            "2024/05/uaf-acep-solar/uaf-acep-solar_2024-05-01.csv",
            &PathMatch {
                dataset_name: "uaf_acep_solar".into(),
                table_name: "uaf_acep_solar".into(),
            },
        )
    }

    async fn publisher() -> PubSubPublisher {
        let base = spawn_server(Router::new().route("/v1/{*rest}", post(publish_handler))).await;
        PubSubPublisher::new(Client::new(), base)
    }

    #[tokio::test]
    async fn test_publish_acknowledged() {
        let publisher = publisher().await;
        let id = publisher
            .publish("projects/p1/topics/csv-arrivals", &message(), &credential("delegated"))
            .await
            .unwrap();
        assert_eq!(id, "4242");
    }

    #[tokio::test]
    async fn test_publish_rejected() {
        let publisher = publisher().await;

        let err = publisher
            .publish("projects/p1/topics/missing", &message(), &credential("delegated"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PublishError");
        assert!(err.to_string().contains("404"));

        let err = publisher
            .publish("projects/p1/topics/csv-arrivals", &message(), &credential("stale"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_publish_without_ack() {
        let publisher = publisher().await;
        let err = publisher
            .publish("projects/p1/topics/silent", &message(), &credential("delegated"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("acknowledged no message"));
    }
}
