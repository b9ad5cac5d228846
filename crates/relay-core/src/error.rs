//! Error types for Bucket Relay

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Credential Errors
    #[error("Secret access failed: {0}")]
    SecretAccess(String),

    #[error("Impersonation failed: {0}")]
    Impersonation(String),

    // Delivery Errors
    #[error("Publish failed: {0}")]
    Publish(String),

    // Inbound Errors
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "ConfigurationError",
            Error::SecretAccess(_) => "SecretAccessError",
            Error::Impersonation(_) => "ImpersonationError",
            Error::Publish(_) => "PublishError",
            Error::InvalidEvent(_) => "InvalidEvent",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidEvent(_) => 400,
            _ => 500,
        }
    }
}

/// JSON error body returned to the event source
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub request_id: String,
}

impl From<Error> for ErrorResponse {
    fn from(err: Error) -> Self {
        ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
            resource: None,
            request_id: String::new(),
        }
    }
}

impl ErrorResponse {
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}
