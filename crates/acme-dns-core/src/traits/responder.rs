// # Challenge Responder Trait
//
// The capability a host ACME client consumes. The host asks whether a
// challenge type is supported, hands over a batch of domain challenges to
// answer, and later asks for the same batch to be cleaned up.

use async_trait::async_trait;

use super::challenge::DomainChallenge;

/// Host-facing challenge responder capability
#[async_trait]
pub trait ChallengeResponder: Send + Sync {
    /// Whether this responder can answer the given challenge type
    fn supports(&self, challenge_type: &str) -> bool;

    /// Whether several challenges may be answered in a single call
    fn supports_batch(&self) -> bool;

    /// Publish every challenge and return once they are all visible
    async fn respond_all(&self, challenges: &[DomainChallenge]) -> Result<(), crate::Error>;

    /// Remove the records published for these challenges
    async fn cleanup_all(&self, challenges: &[DomainChallenge]) -> Result<(), crate::Error>;
}
