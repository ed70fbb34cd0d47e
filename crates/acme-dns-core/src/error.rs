//! Error types for the DNS-01 responder
//!
//! This module defines all error types used throughout the crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for responder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DNS-01 responder
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (unknown zone, missing credentials, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The domain is not covered by any configured zone
    #[error("No configured zone covers domain: {domain}")]
    NoZoneForDomain {
        /// The domain that failed to resolve
        domain: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors (config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message, one provider message per line
        message: String,
    },

    /// The record did not become visible before the deadline
    #[error("Record {record} not visible after {waited:?}")]
    PropagationTimeout {
        /// Fully-qualified record name
        record: String,
        /// How long we waited
        waited: Duration,
    },

    /// The wait was cancelled by the caller
    #[error("Operation cancelled while waiting for {record}")]
    Cancelled {
        /// Fully-qualified record name
        record: String,
    },

    /// Several independent operations failed (cleanup)
    #[error("{} operation(s) failed:\n{}", .0.len(), join_errors(.0))]
    Multiple(Vec<Error>),
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "no zone" error
    pub fn no_zone(domain: impl Into<String>) -> Self {
        Self::NoZoneForDomain {
            domain: domain.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by configuration rather than the remote side
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::NoZoneForDomain { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_lists_every_error() {
        let err = Error::Multiple(vec![
            Error::no_zone("a.other.com"),
            Error::provider("cloudflare", "1000: boom"),
        ]);

        let text = err.to_string();
        assert!(text.starts_with("2 operation(s) failed"));
        assert!(text.contains("a.other.com"));
        assert!(text.contains("1000: boom"));
    }

    #[test]
    fn test_is_config() {
        assert!(Error::config("x").is_config());
        assert!(Error::no_zone("x").is_config());
        assert!(!Error::http("x").is_config());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: Error = io.into();

        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_config());
        assert_eq!(err.to_string(), "IO error: no such file");
    }
}
