//! Ambient runtime identity from the compute metadata server

use async_trait::async_trait;
use relay_core::{Error, Result};
use reqwest::Client;
use tracing::debug;

use crate::token::{AccessToken, TokenResponse, TokenSource};

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Token source for the identity the relay itself runs as
#[derive(Clone)]
pub struct MetadataTokenSource {
    http: Client,
    base_url: String,
}

impl MetadataTokenSource {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TokenSource for MetadataTokenSource {
    async fn access_token(&self) -> Result<AccessToken> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), TOKEN_PATH);
        debug!("Requesting runtime token from {}", url);

        let response = self
            .http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::Other(anyhow::anyhow!("metadata server unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Other(anyhow::anyhow!(
                "metadata server returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            Error::Other(anyhow::anyhow!("malformed metadata token response: {}", e))
        })?;

        Ok(token.into_access_token())
    }
}
