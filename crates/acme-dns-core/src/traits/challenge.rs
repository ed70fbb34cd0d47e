// # Challenge Capability
//
// The host ACME client owns challenge objects; the responder only reads three
// things from them: the record label, the record type and the record content.
//
// ## Usage
//
// ```rust
// use acme_dns_core::traits::{Challenge, DomainChallenge, Dns01Challenge};
//
// let challenge = Dns01Challenge::new("_acme-challenge", "tok1");
// let pair = DomainChallenge::new("a.example.com", challenge);
//
// assert_eq!(pair.record_fqdn(), "_acme-challenge.a.example.com");
// assert_eq!(pair.challenge.record_type(), "TXT");
// ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Challenge type identifier handled by this crate
pub const DNS01: &str = "dns-01";

/// Default record label for DNS-01 challenges
pub const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

/// Record type used by DNS-01 challenges
pub const TXT: &str = "TXT";

/// What the responder needs to know about a challenge
///
/// Any host-side challenge representation can implement this.
pub trait Challenge: Send + Sync {
    /// Subdomain label of the record (e.g. `_acme-challenge`)
    fn record_name(&self) -> &str;

    /// Record type, `TXT` for DNS-01
    fn record_type(&self) -> &str;

    /// Record content (the token digest)
    fn record_content(&self) -> &str;
}

/// Plain DNS-01 challenge value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dns01Challenge {
    record_name: String,
    record_type: String,
    record_content: String,
}

impl Dns01Challenge {
    /// Create a TXT challenge with the given label and content
    pub fn new(record_name: impl Into<String>, record_content: impl Into<String>) -> Self {
        Self {
            record_name: record_name.into(),
            record_type: TXT.to_string(),
            record_content: record_content.into(),
        }
    }

    /// Create a challenge from an ACME key authorization
    ///
    /// The record content is the base64url (unpadded) SHA-256 digest of the
    /// key authorization, as required by RFC 8555 §8.4.
    pub fn from_key_authorization(key_authorization: &str) -> Self {
        Self::new(
            ACME_CHALLENGE_LABEL,
            digest_key_authorization(key_authorization),
        )
    }

    /// Override the record label
    pub fn with_record_name(mut self, record_name: impl Into<String>) -> Self {
        self.record_name = record_name.into();
        self
    }
}

impl Challenge for Dns01Challenge {
    fn record_name(&self) -> &str {
        &self.record_name
    }

    fn record_type(&self) -> &str {
        &self.record_type
    }

    fn record_content(&self) -> &str {
        &self.record_content
    }
}

/// Compute the TXT content for a key authorization
pub fn digest_key_authorization(key_authorization: &str) -> String {
    let digest = Sha256::digest(key_authorization.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// A domain under validation paired with its challenge
#[derive(Clone)]
pub struct DomainChallenge {
    /// Fully-qualified domain being validated
    pub domain: String,
    /// The challenge for that domain
    pub challenge: Arc<dyn Challenge>,
}

impl DomainChallenge {
    /// Pair a domain with a challenge
    pub fn new(domain: impl Into<String>, challenge: impl Challenge + 'static) -> Self {
        Self {
            domain: domain.into(),
            challenge: Arc::new(challenge),
        }
    }

    /// Pair a domain with an already shared challenge
    pub fn shared(domain: impl Into<String>, challenge: Arc<dyn Challenge>) -> Self {
        Self {
            domain: domain.into(),
            challenge,
        }
    }

    /// Fully-qualified record name: `<label>.<domain>`
    pub fn record_fqdn(&self) -> String {
        format!("{}.{}", self.challenge.record_name(), self.domain)
    }
}

impl fmt::Debug for DomainChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainChallenge")
            .field("domain", &self.domain)
            .field("record_name", &self.challenge.record_name())
            .field("record_type", &self.challenge.record_type())
            .finish()
    }
}
