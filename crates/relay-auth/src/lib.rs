//! Authentication for Bucket Relay
//!
//! Produces the short-lived delegated credential used to publish:
//! the base service-account key is read from Secret Manager, exchanged for
//! a source token, and the source identity then impersonates the
//! publishing service account.

pub mod impersonation;
pub mod metadata;
pub mod provider;
pub mod secrets;
pub mod service_account;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use impersonation::ImpersonationClient;
pub use metadata::MetadataTokenSource;
pub use provider::{CredentialProvider, ImpersonatedCredentialProvider};
pub use secrets::{SecretManagerClient, SecretStore};
pub use service_account::{ServiceAccountKey, ServiceAccountTokenSource};
pub use token::{AccessToken, DelegatedCredential, TokenSource};

use relay_core::{Error, Result};
use std::time::Duration;

/// Build the HTTP client shared by every Google API call
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))
}
