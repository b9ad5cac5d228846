//! Delegated credential provider
//!
//! Every call walks the full chain: secret lookup, source identity,
//! impersonation. Nothing is cached between invocations.

use async_trait::async_trait;
use relay_core::types::CLOUD_PLATFORM_SCOPE;
use relay_core::{RelayConfig, Result};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

use crate::impersonation::ImpersonationClient;
use crate::metadata::MetadataTokenSource;
use crate::secrets::{SecretManagerClient, SecretStore};
use crate::service_account::{ServiceAccountKey, ServiceAccountTokenSource};
use crate::token::{DelegatedCredential, TokenSource};

/// Source of the credential used to publish
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn delegated_credential(&self) -> Result<DelegatedCredential>;
}

/// Impersonates the publishing service account using a key kept in the
/// secrets store
pub struct ImpersonatedCredentialProvider {
    http: Client,
    secrets: Arc<dyn SecretStore>,
    secret_name: String,
    impersonation: ImpersonationClient,
    target: String,
    scopes: Vec<String>,
    lifetime_secs: u64,
}

impl ImpersonatedCredentialProvider {
    pub fn new(
        http: Client,
        secrets: Arc<dyn SecretStore>,
        secret_name: impl Into<String>,
        impersonation: ImpersonationClient,
        target: impl Into<String>,
        scopes: Vec<String>,
        lifetime_secs: u64,
    ) -> Self {
        Self {
            http,
            secrets,
            secret_name: secret_name.into(),
            impersonation,
            target: target.into(),
            scopes,
            lifetime_secs,
        }
    }

    /// Wire up the Google API clients described by the configuration
    pub fn from_config(config: &RelayConfig, http: Client) -> Self {
        let runtime = MetadataTokenSource::new(http.clone(), config.endpoints.metadata.clone());
        let secrets = SecretManagerClient::new(
            http.clone(),
            config.endpoints.secret_manager.clone(),
            Arc::new(runtime),
        );
        let impersonation =
            ImpersonationClient::new(http.clone(), config.endpoints.iam_credentials.clone());

        Self::new(
            http,
            Arc::new(secrets),
            config
                .credentials
                .secret_version_name(&config.routing.project_id),
            impersonation,
            config.credentials.impersonate_service_account.clone(),
            config.credentials.target_scopes.clone(),
            config.credentials.token_lifetime_secs,
        )
    }
}

#[async_trait]
impl CredentialProvider for ImpersonatedCredentialProvider {
    async fn delegated_credential(&self) -> Result<DelegatedCredential> {
        let key_json = self.secrets.access_secret(&self.secret_name).await?;
        let key = ServiceAccountKey::from_json(&key_json)?;
        debug!("Loaded source identity {}", key.client_email);

        let source = ServiceAccountTokenSource::new(
            self.http.clone(),
            key,
            vec![CLOUD_PLATFORM_SCOPE.to_string()],
        );
        let source_token = source.access_token().await?;

        let access_token = self
            .impersonation
            .generate_access_token(&source_token, &self.target, &self.scopes, self.lifetime_secs)
            .await?;

        info!(
            "Obtained delegated credential for {} (source {}, expires {})",
            self.target,
            source.client_email(),
            access_token.expires_at
        );

        Ok(DelegatedCredential {
            service_account: self.target.clone(),
            scopes: self.scopes.clone(),
            access_token,
        })
    }
}
