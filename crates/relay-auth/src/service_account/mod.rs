//! Service-account key identity
//!
//! Parses a service-account key and exchanges a signed JWT assertion for
//! an access token (RFC 7523 bearer grant).

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use relay_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::token::{AccessToken, TokenResponse, TokenSource};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Service-account key file contents
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Decode a key from the JSON stored in the secrets store
    pub fn from_json(json: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(json)
            .map_err(|e| Error::SecretAccess(format!("malformed service account key: {}", e)))?;

        if key.key_type != "service_account" {
            return Err(Error::SecretAccess(format!(
                "expected a service_account key, found {}",
                key.key_type
            )));
        }
        if key.client_email.is_empty() || key.private_key.is_empty() {
            return Err(Error::SecretAccess(
                "service account key is missing client_email or private_key".into(),
            ));
        }

        Ok(key)
    }
}

/// Claims of the JWT bearer assertion
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token source that signs in as the service account in a key
pub struct ServiceAccountTokenSource {
    http: Client,
    key: ServiceAccountKey,
    scopes: Vec<String>,
}

impl ServiceAccountTokenSource {
    pub fn new(http: Client, key: ServiceAccountKey, scopes: Vec<String>) -> Self {
        Self { http, key, scopes }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Sign the assertion presented to the token endpoint
    pub fn signed_assertion(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: self.key.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| Error::SecretAccess(format!("unusable private key: {}", e)))?;

        encode(&header, &claims, &signing_key)
            .map_err(|e| Error::Impersonation(format!("failed to sign assertion: {}", e)))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<AccessToken> {
        let assertion = self.signed_assertion()?;
        let form = serde_urlencoded::to_string([
            ("grant_type", JWT_BEARER_GRANT),
            ("assertion", assertion.as_str()),
        ])
        .map_err(|e| Error::Impersonation(format!("failed to encode token request: {}", e)))?;

        debug!(
            "Exchanging assertion for {} at {}",
            self.key.client_email, self.key.token_uri
        );

        let response = self
            .http
            .post(&self.key.token_uri)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|e| Error::Impersonation(format!("token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Impersonation(format!(
                "token endpoint rejected {}: {} {}",
                self.key.client_email, status, detail
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Impersonation(format!("malformed token response: {}", e)))?;

        Ok(token.into_access_token())
    }
}
