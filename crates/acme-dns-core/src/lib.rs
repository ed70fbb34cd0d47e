// # acme-dns-core
//
// Core library for answering ACME DNS-01 challenges through a DNS provider API.
//
// ## Architecture Overview
//
// - **Challenge**: What the responder reads from a host challenge object
// - **DnsProvider**: Trait for TXT record operations via provider APIs
// - **ChallengeResponder**: Capability the host ACME client calls
// - **DnsChallengeResponder**: Engine that maps challenges to record
//   operations, replaces stale records once, and waits for propagation
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Thin core**: the ACME protocol, certificates and storage belong to the host
// 2. **Resolve once**: zones are looked up at construction and never again
// 3. **Typed outcomes**: a duplicate record is a value, not an error string
// 4. **Bounded waits**: every propagation wait has a deadline and can be cancelled

pub mod config;
pub mod error;
pub mod registry;
pub mod responder;
pub mod traits;

// Re-export core types for convenience
pub use config::{PropagationConfig, ProviderConfig, ResponderConfig};
pub use error::{Error, Result};
pub use registry::ProviderRegistry;
pub use responder::{DnsChallengeResponder, ResponderEvent};
pub use traits::{Challenge, ChallengeResponder, DnsProvider, DomainChallenge};
pub use tokio_util::sync::CancellationToken;
