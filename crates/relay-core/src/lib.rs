//! Bucket Relay Core Library
//!
//! Core types, configuration and path matching for the bucket relay.

pub mod config;
pub mod error;
pub mod matcher;
pub mod types;
pub mod utils;

pub use config::RelayConfig;
pub use error::{Error, Result};
pub use matcher::{normalize_object_path, PathMatch, PathMatcher};

/// Bucket relay version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Object path separator
pub const PATH_SEPARATOR: char = '/';

/// Lifetime of the delegated publishing credential (seconds)
pub const DELEGATED_TOKEN_LIFETIME_SECS: u64 = 600;

/// Minimum number of capture groups in a path pattern
pub const MIN_PATTERN_GROUPS: usize = 1;

/// Maximum number of capture groups in a path pattern
pub const MAX_PATTERN_GROUPS: usize = 3;
