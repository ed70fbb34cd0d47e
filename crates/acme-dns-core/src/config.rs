//! Configuration types for the DNS-01 responder
//!
//! This module defines all configuration structures used throughout the crate.
//! Everything here is plain data: credentials are resolved (including the
//! environment fallback) by the provider factory, and zone names are resolved
//! against the provider when the responder is constructed.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main responder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// DNS provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Zone names to manage, in match priority order
    pub zones: Vec<String>,

    /// TTL (seconds) of the challenge records
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Propagation wait settings
    #[serde(default)]
    pub propagation: PropagationConfig,
}

impl ResponderConfig {
    /// Create a configuration for the given zones with defaults elsewhere
    pub fn new<I, S>(zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            provider: ProviderConfig::default(),
            zones: zones.into_iter().map(Into::into).collect(),
            ttl: default_ttl(),
            propagation: PropagationConfig::default(),
        }
    }

    /// Set the record TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the provider configuration
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    /// Set the propagation settings
    pub fn with_propagation(mut self, propagation: PropagationConfig) -> Self {
        self.propagation = propagation;
        self
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zones.is_empty() {
            return Err(crate::Error::config("No zones configured"));
        }

        for zone in &self.zones {
            let trimmed = zone.trim_end_matches('.');
            if trimmed.is_empty() {
                return Err(crate::Error::config("Zone name cannot be empty"));
            }
            if trimmed.chars().any(char::is_whitespace) {
                return Err(crate::Error::config(format!(
                    "Zone name contains whitespace: '{}'",
                    zone
                )));
            }
        }

        // Cloudflare treats 1 as "automatic"; the upper bound is one day.
        if !(1..=86_400).contains(&self.ttl) {
            return Err(crate::Error::config(format!(
                "TTL must be between 1 and 86400 seconds. Got: {}",
                self.ttl
            )));
        }

        self.provider.validate()?;
        self.propagation.validate()?;

        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// API key (global key, or scoped token when no email is set).
        /// Falls back to `CLOUDFLARE_KEY`.
        #[serde(default)]
        key: Option<String>,
        /// Account email. Falls back to `CLOUDFLARE_EMAIL`.
        #[serde(default)]
        email: Option<String>,
        /// API base URL override
        #[serde(default)]
        api_base: Option<String>,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

// The key must never show up in logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                key,
                email,
                api_base,
            } => f
                .debug_struct("Cloudflare")
                .field("key", &key.as_ref().map(|_| "<REDACTED>"))
                .field("email", email)
                .field("api_base", api_base)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    ///
    /// Missing Cloudflare credentials are not an error here: the factory
    /// falls back to the environment and reports their absence.
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { key, api_base, .. } => {
                if key.as_deref().is_some_and(str::is_empty) {
                    return Err(crate::Error::config("Cloudflare key cannot be empty"));
                }
                if let Some(base) = api_base
                    && !base.starts_with("https://")
                    && !base.starts_with("http://")
                {
                    return Err(crate::Error::config(format!(
                        "Cloudflare API base must be an HTTP(S) URL. Got: {}",
                        base
                    )));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Cloudflare {
            key: None,
            email: None,
            api_base: None,
        }
    }
}

/// Upper bound for the poll interval (one hour)
pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;

/// Upper bound for the propagation timeout (one day)
pub const MAX_PROPAGATION_TIMEOUT_SECS: u64 = 86_400;

/// Settings for the wait between record creation and visibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Delay between two lookups (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for a single record's wait (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl PropagationConfig {
    /// Delay between two lookups
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound for a single record's wait
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the propagation settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(crate::Error::config(format!(
                "Poll interval must be between 1 and {} ms. Got: {}",
                MAX_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }
        if !(1..=MAX_PROPAGATION_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "Propagation timeout must be between 1 and {} seconds. Got: {}",
                MAX_PROPAGATION_TIMEOUT_SECS, self.timeout_secs
            )));
        }
        Ok(())
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_ttl() -> u32 {
    120
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_timeout_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json() {
        let config = ResponderConfig::from_json(r#"{"zones": ["example.com"]}"#).unwrap();

        assert_eq!(config.zones, vec!["example.com".to_string()]);
        assert_eq!(config.ttl, 120);
        assert_eq!(config.propagation, PropagationConfig::default());
        assert_eq!(config.provider.type_name(), "cloudflare");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_json() {
        let config = ResponderConfig::from_json(
            r#"{
                "provider": {"type": "cloudflare", "key": "k", "email": "ops@example.com"},
                "zones": ["example.com", "example.org"],
                "ttl": 60,
                "propagation": {"poll_interval_ms": 50, "timeout_secs": 10}
            }"#,
        )
        .unwrap();

        assert_eq!(config.ttl, 60);
        assert_eq!(config.propagation.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.propagation.timeout(), Duration::from_secs(10));
        match config.provider {
            ProviderConfig::Cloudflare { key, email, .. } => {
                assert_eq!(key.as_deref(), Some("k"));
                assert_eq!(email.as_deref(), Some("ops@example.com"));
            }
            other => panic!("unexpected provider: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ResponderConfig::new(Vec::<String>::new()).validate().is_err());
        assert!(ResponderConfig::new([""]).validate().is_err());
        assert!(ResponderConfig::new(["exa mple.com"]).validate().is_err());
        assert!(ResponderConfig::new(["example.com"]).with_ttl(0).validate().is_err());

        let bad_interval = ResponderConfig::new(["example.com"]).with_propagation(
            PropagationConfig {
                poll_interval_ms: 0,
                timeout_secs: 1,
            },
        );
        assert!(bad_interval.validate().is_err());

        let huge_timeout = ResponderConfig::new(["example.com"]).with_propagation(
            PropagationConfig {
                poll_interval_ms: 10,
                timeout_secs: u64::MAX,
            },
        );
        assert!(huge_timeout.validate().is_err());

        let huge_interval = ResponderConfig::new(["example.com"]).with_propagation(
            PropagationConfig {
                poll_interval_ms: u64::MAX,
                timeout_secs: 1,
            },
        );
        assert!(huge_interval.validate().is_err());

        let bad_base = ResponderConfig::new(["example.com"]).with_provider(
            ProviderConfig::Cloudflare {
                key: Some("k".to_string()),
                email: None,
                api_base: Some("ftp://nope".to_string()),
            },
        );
        assert!(bad_base.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!(
            "acme-dns-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"zones": ["example.org"], "ttl": 300}"#).unwrap();

        let config = ResponderConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.zones, vec!["example.org".to_string()]);
        assert_eq!(config.ttl, 300);
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let err = ResponderConfig::from_file("/nonexistent/acme-dns/config.json").unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn test_propagation_bounds_inclusive() {
        let max = PropagationConfig {
            poll_interval_ms: MAX_POLL_INTERVAL_MS,
            timeout_secs: MAX_PROPAGATION_TIMEOUT_SECS,
        };
        assert!(max.validate().is_ok());

        let over = PropagationConfig {
            poll_interval_ms: 10,
            timeout_secs: MAX_PROPAGATION_TIMEOUT_SECS + 1,
        };
        assert!(over.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_key_not_exposed_in_debug() {
        let config = ProviderConfig::Cloudflare {
            key: Some("secret_key_12345".to_string()),
            email: Some("ops@example.com".to_string()),
            api_base: None,
        };

        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("ops@example.com"));
    }
}
