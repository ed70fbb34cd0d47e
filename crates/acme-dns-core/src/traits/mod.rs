//! Core traits for the DNS-01 responder
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Challenge`]: What the responder reads from a host challenge
//! - [`DnsProvider`]: Manipulate TXT records via provider APIs
//! - [`ChallengeResponder`]: The capability exposed to the host

pub mod challenge;
pub mod dns_provider;
pub mod responder;

pub use challenge::{
    ACME_CHALLENGE_LABEL, Challenge, DNS01, Dns01Challenge, DomainChallenge, TXT,
    digest_key_authorization,
};
pub use dns_provider::{
    ApiErrors, ApiMessage, CreateOutcome, DnsProvider, DnsProviderFactory, DnsRecord, NewRecord,
    Zone,
};
pub use responder::ChallengeResponder;
