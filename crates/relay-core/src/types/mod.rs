//! Core types for Bucket Relay

mod event;
mod message;

pub use event::*;
pub use message::*;

/// OAuth scope granting access to all Google Cloud APIs
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
