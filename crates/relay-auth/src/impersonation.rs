//! Service-account impersonation through the IAM Credentials API

use chrono::{DateTime, Utc};
use relay_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::token::AccessToken;

#[derive(Debug, Serialize)]
struct GenerateAccessTokenRequest<'a> {
    scope: &'a [String],
    lifetime: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAccessTokenResponse {
    access_token: String,
    expire_time: DateTime<Utc>,
}

/// Client for `generateAccessToken`
#[derive(Clone)]
pub struct ImpersonationClient {
    http: Client,
    base_url: String,
}

impl ImpersonationClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn generate_url(&self, target: &str) -> String {
        format!(
            "{}/v1/projects/-/serviceAccounts/{}:generateAccessToken",
            self.base_url.trim_end_matches('/'),
            target
        )
    }

    /// Ask for a token of `target`, vouched for by `source`
    pub async fn generate_access_token(
        &self,
        source: &AccessToken,
        target: &str,
        scopes: &[String],
        lifetime_secs: u64,
    ) -> Result<AccessToken> {
        let request = GenerateAccessTokenRequest {
            scope: scopes,
            lifetime: format!("{}s", lifetime_secs),
        };

        debug!("Impersonating {} for {}s", target, lifetime_secs);

        let response = self
            .http
            .post(self.generate_url(target))
            .header("Authorization", source.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::Impersonation(format!("request to impersonate {} failed: {}", target, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Impersonation(format!(
                "impersonation of {} rejected: {} {}",
                target, status, detail
            )));
        }

        let token: GenerateAccessTokenResponse = response.json().await.map_err(|e| {
            Error::Impersonation(format!("malformed impersonation response: {}", e))
        })?;

        Ok(AccessToken::new(token.access_token, token.expire_time))
    }
}
