//! Access tokens and the delegated publishing credential

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use relay_core::Result;
use serde::Deserialize;

/// OAuth2 bearer token with its expiry
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Short-lived token issued to the impersonated publishing identity
#[derive(Debug, Clone)]
pub struct DelegatedCredential {
    pub service_account: String,
    pub scopes: Vec<String>,
    pub access_token: AccessToken,
}

impl DelegatedCredential {
    pub fn bearer(&self) -> String {
        self.access_token.bearer()
    }
}

/// Anything that can mint an access token
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken>;
}

/// OAuth2 token endpoint response (also served by the metadata server)
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn into_access_token(self) -> AccessToken {
        // Tokens without a stated lifetime get the OAuth default of one hour
        let lifetime = self.expires_in.unwrap_or(3600);
        AccessToken::new(self.access_token, Utc::now() + Duration::seconds(lifetime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer() {
        let token = AccessToken::new("abc", Utc::now() + Duration::seconds(600));
        assert_eq!(token.bearer(), "Bearer abc");
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = AccessToken::new("super-secret", Utc::now());
        let debug = format!("{:?}", token);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_token_response_lifetime() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"t","expires_in":120,"token_type":"Bearer"}"#)
                .unwrap();
        let token = response.into_access_token();
        assert_eq!(token.token, "t");
        let remaining = token.expires_at - Utc::now();
        assert!(remaining <= Duration::seconds(120));
        assert!(remaining > Duration::seconds(100));
    }
}
