//! Secret Manager access
//!
//! Read-only lookup of secret payloads by resource name.

use async_trait::async_trait;
use base64::Engine;
use relay_core::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::token::TokenSource;

/// Secrets store lookup
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Return the UTF-8 payload of a secret version
    async fn access_secret(&self, name: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    #[serde(default)]
    data: String,
}

/// Secret Manager REST client authenticated as the runtime identity
#[derive(Clone)]
pub struct SecretManagerClient {
    http: Client,
    base_url: String,
    credentials: Arc<dyn TokenSource>,
}

impl SecretManagerClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        credentials: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            credentials,
        }
    }

    fn access_url(&self, name: &str) -> String {
        format!("{}/v1/{}:access", self.base_url.trim_end_matches('/'), name)
    }
}

#[async_trait]
impl SecretStore for SecretManagerClient {
    async fn access_secret(&self, name: &str) -> Result<String> {
        let token = self.credentials.access_token().await.map_err(|e| {
            Error::SecretAccess(format!("no runtime credentials to read {}: {}", name, e))
        })?;

        let url = self.access_url(name);
        debug!("Accessing secret version {}", name);

        let response = self
            .http
            .get(&url)
            .header("Authorization", token.bearer())
            .send()
            .await
            .map_err(|e| Error::SecretAccess(format!("request for {} failed: {}", name, e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(Error::SecretAccess(format!("secret {} not found", name)));
            }
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                return Err(Error::SecretAccess(format!("access to {} denied", name)));
            }
            status => {
                return Err(Error::SecretAccess(format!(
                    "reading {} returned {}",
                    name, status
                )));
            }
        }

        let body: AccessSecretVersionResponse = response
            .json()
            .await
            .map_err(|e| Error::SecretAccess(format!("malformed response for {}: {}", name, e)))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(body.payload.data.as_bytes())
            .map_err(|e| Error::SecretAccess(format!("payload of {} is not base64: {}", name, e)))?;

        String::from_utf8(bytes)
            .map_err(|_| Error::SecretAccess(format!("payload of {} is not UTF-8", name)))
    }
}
