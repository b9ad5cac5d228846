//! Test doubles shared by the api tests

use async_trait::async_trait;
use chrono::{Duration, Utc};
use relay_auth::{AccessToken, CredentialProvider, DelegatedCredential};
use relay_core::matcher::DEFAULT_CSV_PATTERN;
use relay_core::types::OutboundMessage;
use relay_core::{Error, PathMatcher, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::events::{EventRouter, Publisher};

/// Serve `router` on an ephemeral local port
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub const SOLAR: &str = "2024/05/uaf-acep-solar/uaf-acep-solar_2024-05-01.csv";

#[derive(Default)]
pub struct StubCredentials {
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl CredentialProvider for StubCredentials {
    async fn delegated_credential(&self) -> Result<DelegatedCredential> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Impersonation("target identity rejected".into()));
        }
        Ok(DelegatedCredential {
            service_account: "publisher@p1.iam.gserviceaccount.com".into(),
            scopes: vec![],
            access_token: AccessToken::new("delegated", Utc::now() + Duration::seconds(600)),
        })
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub fail: bool,
    pub published: Mutex<Vec<(String, OutboundMessage)>>,
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(
        &self,
        topic: &str,
        message: &OutboundMessage,
        _credential: &DelegatedCredential,
    ) -> Result<String> {
        if self.fail {
            return Err(Error::Publish("deadline exceeded".into()));
        }
        let mut published = self.published.lock().unwrap();
        published.push((topic.to_string(), message.clone()));
        Ok(format!("msg-{}", published.len()))
    }
}

pub fn router(
    credentials: Arc<StubCredentials>,
    publisher: Arc<RecordingPublisher>,
) -> EventRouter {
    EventRouter::new(
        PathMatcher::new(DEFAULT_CSV_PATTERN).unwrap(),
        "projects/p1/topics/csv-arrivals",
        credentials,
        publisher,
    )
}

