// # DNS Provider Trait
//
// Defines the interface the responder uses to manipulate TXT records through
// a provider API.
//
// ## Implementations
//
// - Cloudflare: `acme-dns-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use acme_dns_core::traits::{CreateOutcome, DnsProvider, NewRecord};
//
// let zone = provider.find_zone("example.com").await?.expect("zone exists");
// let record = NewRecord::new("TXT", "_acme-challenge.example.com", "tok1", 120);
//
// match provider.create_record(&zone, &record).await? {
//     CreateOutcome::Created(created) => println!("created {}", created.id),
//     CreateOutcome::Conflict(errors) => println!("already there: {}", errors),
//     CreateOutcome::Rejected(errors) => println!("rejected: {}", errors),
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A provider-side DNS zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-specific zone identifier
    pub id: String,
    /// Zone apex name (e.g. "example.com")
    pub name: String,
}

impl Zone {
    /// Create a zone value
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A provider-side DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-specific record identifier
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record type (TXT, A, ...)
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record content
    pub content: String,
    /// Time-to-live, when reported
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// Payload of a create-record request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Record type
    #[serde(rename = "type")]
    pub record_type: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record content
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
}

impl NewRecord {
    /// Create a record payload
    pub fn new(
        record_type: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            name: name.into(),
            content: content.into(),
            ttl,
        }
    }
}

/// One error entry reported by a provider API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Provider error code
    pub code: u32,
    /// Human-readable message
    pub message: String,
}

impl fmt::Display for ApiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// The error list of a failed provider call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiErrors(pub Vec<ApiMessage>);

impl ApiErrors {
    /// True if any entry carries one of the given codes
    pub fn has_code(&self, codes: &[u32]) -> bool {
        self.0.iter().any(|m| codes.contains(&m.code))
    }

    /// True if the provider returned no detail
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// One message per line.
impl fmt::Display for ApiErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("unknown provider error");
        }
        let lines: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Result of a create-record call
///
/// Transport and authentication failures are returned as `Err`; this type
/// covers the answers the provider actually gave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Record was created
    Created(DnsRecord),
    /// A record with the same name already exists
    Conflict(ApiErrors),
    /// Any other provider-side rejection
    Rejected(ApiErrors),
}

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Retries
///
/// Providers execute exactly one API call per method invocation. The single
/// delete-and-retry on conflict is owned by the responder.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up a zone by exact name
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Zone))`: The zone exists in the account
    /// - `Ok(None)`: No zone with that name
    /// - `Err(Error)`: The request failed
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>, crate::Error>;

    /// Create a record in a zone
    async fn create_record(
        &self,
        zone: &Zone,
        record: &NewRecord,
    ) -> Result<CreateOutcome, crate::Error>;

    /// Find a record by fully-qualified name
    async fn find_record(&self, zone: &Zone, name: &str)
    -> Result<Option<DnsRecord>, crate::Error>;

    /// Delete a record by id
    async fn delete_record(&self, zone: &Zone, record_id: &str) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
