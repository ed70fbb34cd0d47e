//! DNS-01 challenge responder
//!
//! The DnsChallengeResponder is responsible for:
//! - Resolving the configured zones once, at construction
//! - Publishing one TXT record per domain challenge
//! - Replacing a stale record exactly once when the provider reports a conflict
//! - Waiting (bounded, cancellable) until every record is visible
//! - Removing the records again on cleanup
//!
//! ## Flow
//!
//! ```text
//!            respond_all(batch)
//!                    │
//!     ┌──────────────┴──────────────┐
//!     ▼                             ▼
//! pass 1: create              pass 2: wait
//! (in order, fail fast)       (in order, after every create)
//!     │                             │
//!     ▼                             ▼
//! ┌─────────────┐            ┌─────────────┐
//! │ DnsProvider │            │ DnsProvider │
//! │ (create)    │            │ (find)      │
//! └─────────────┘            └─────────────┘
//! ```
//!
//! Records created before a failure in the first pass are left in place; the
//! host is expected to call `cleanup_all` for the batch.

use crate::config::{PropagationConfig, ResponderConfig};
use crate::error::{Error, Result};
use crate::registry::ProviderRegistry;
use crate::traits::{
    ApiErrors, ChallengeResponder, CreateOutcome, DNS01, DnsProvider, DomainChallenge, NewRecord,
    Zone,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Capacity of the progress event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Progress events emitted by the responder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderEvent {
    /// Challenge record created
    RecordCreated {
        domain: String,
        record_name: String,
        record_id: String,
    },

    /// A stale record with the same name was removed and the record recreated
    StaleRecordReplaced {
        domain: String,
        record_name: String,
    },

    /// Propagation wait started for a record
    WaitingForPropagation {
        domain: String,
        record_name: String,
    },

    /// Record became visible
    Propagated {
        domain: String,
        record_name: String,
        elapsed: Duration,
    },

    /// Challenge record removed during cleanup
    RecordRemoved {
        domain: String,
        record_name: String,
    },

    /// Nothing to remove during cleanup
    CleanupSkipped {
        domain: String,
        record_name: String,
    },
}

/// DNS-01 challenge responder backed by a [`DnsProvider`]
///
/// ## Lifecycle
///
/// 1. Create with [`DnsChallengeResponder::new()`] (resolves the zones)
/// 2. Call [`ChallengeResponder::respond_all()`] with a batch
/// 3. Call [`ChallengeResponder::cleanup_all()`] with the same batch
///
/// ## Threading
///
/// Every provider call is awaited before the next one starts. The zone list
/// is immutable after construction, so the responder can be shared behind an
/// `Arc`; concurrent calls are not coordinated with each other.
pub struct DnsChallengeResponder {
    /// DNS provider for record operations
    provider: Box<dyn DnsProvider>,

    /// Resolved zones, in configured priority order
    zones: Vec<Zone>,

    /// TTL of the challenge records
    ttl: u32,

    /// Propagation wait settings
    propagation: PropagationConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ResponderEvent>,
}

impl DnsChallengeResponder {
    /// Create a new responder
    ///
    /// Every configured zone name is looked up at the provider by exact name.
    /// A missing zone is a configuration error and aborts construction.
    ///
    /// # Returns
    ///
    /// A tuple of (responder, event_receiver) where event_receiver yields
    /// progress events
    pub async fn new(
        provider: Box<dyn DnsProvider>,
        config: ResponderConfig,
    ) -> Result<(Self, mpsc::Receiver<ResponderEvent>)> {
        config.validate()?;

        let mut zones = Vec::with_capacity(config.zones.len());
        for name in &config.zones {
            let zone = provider.find_zone(name).await?.ok_or_else(|| {
                Error::config(format!(
                    "{} is not configured in {}",
                    name,
                    provider.provider_name()
                ))
            })?;
            debug!("Resolved zone {} -> {}", zone.name, zone.id);
            zones.push(zone);
        }

        info!(
            "Responder ready: {} zone(s) via {}",
            zones.len(),
            provider.provider_name()
        );

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let responder = Self {
            provider,
            zones,
            ttl: config.ttl,
            propagation: config.propagation,
            event_tx: tx,
        };

        Ok((responder, rx))
    }

    /// Create a responder whose provider is built by a registry
    pub async fn from_registry(
        registry: &ProviderRegistry,
        config: ResponderConfig,
    ) -> Result<(Self, mpsc::Receiver<ResponderEvent>)> {
        let provider = registry.create_provider(&config.provider)?;
        Self::new(provider, config).await
    }

    /// Resolved zones, in configured order
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Find the zone owning a domain
    ///
    /// The first configured zone whose name is a label-aligned suffix of the
    /// domain wins.
    pub fn zone_for(&self, domain: &str) -> Result<&Zone> {
        self.zones
            .iter()
            .find(|zone| zone_covers(&zone.name, domain))
            .ok_or_else(|| Error::no_zone(domain))
    }

    /// Publish every challenge, then wait until each one is visible
    ///
    /// Same as [`ChallengeResponder::respond_all()`] but the propagation wait
    /// stops with [`Error::Cancelled`] as soon as `cancel` fires.
    pub async fn respond_all_with_cancel(
        &self,
        challenges: &[DomainChallenge],
        cancel: &CancellationToken,
    ) -> Result<()> {
        // Pass 1: every create before any wait
        for pair in challenges {
            let zone = self.zone_for(&pair.domain)?;
            self.publish(zone, pair).await?;
        }

        // Pass 2: propagation
        for pair in challenges {
            let zone = self.zone_for(&pair.domain)?;
            self.wait_for_record(zone, pair, cancel).await?;
        }

        Ok(())
    }

    /// Create the record for one challenge, replacing a stale one once
    async fn publish(&self, zone: &Zone, pair: &DomainChallenge) -> Result<()> {
        let fqdn = pair.record_fqdn();
        let record = NewRecord::new(
            pair.challenge.record_type(),
            fqdn.as_str(),
            pair.challenge.record_content(),
            self.ttl,
        );

        debug!("Creating {} record {} in zone {}", record.record_type, fqdn, zone.name);

        match self.provider.create_record(zone, &record).await? {
            CreateOutcome::Created(created) => {
                info!("Created challenge record {} ({})", fqdn, created.id);
                self.emit_event(ResponderEvent::RecordCreated {
                    domain: pair.domain.clone(),
                    record_name: fqdn,
                    record_id: created.id,
                });
                Ok(())
            }
            CreateOutcome::Conflict(errors) => {
                info!("found old challenge for {}; remove and retry", pair.domain);
                debug!("Conflict reported by provider: {}", errors);

                self.remove_stale_record(zone, &fqdn).await?;

                match self.provider.create_record(zone, &record).await? {
                    CreateOutcome::Created(created) => {
                        info!("Recreated challenge record {} ({})", fqdn, created.id);
                        self.emit_event(ResponderEvent::StaleRecordReplaced {
                            domain: pair.domain.clone(),
                            record_name: fqdn,
                        });
                        Ok(())
                    }
                    CreateOutcome::Conflict(errors) | CreateOutcome::Rejected(errors) => {
                        Err(self.creation_failed(&fqdn, errors))
                    }
                }
            }
            CreateOutcome::Rejected(errors) => Err(self.creation_failed(&fqdn, errors)),
        }
    }

    /// Delete whatever record currently holds `fqdn`
    ///
    /// A record that vanished in the meantime is fine; a failing delete is not.
    async fn remove_stale_record(&self, zone: &Zone, fqdn: &str) -> Result<()> {
        let Some(stale) = self.provider.find_record(zone, fqdn).await? else {
            debug!("Stale record {} already gone", fqdn);
            return Ok(());
        };

        self.provider
            .delete_record(zone, &stale.id)
            .await
            .map_err(|e| {
                Error::provider(
                    self.provider.provider_name(),
                    format!("failed to remove stale record {}: {}", fqdn, e),
                )
            })
    }

    fn creation_failed(&self, fqdn: &str, errors: ApiErrors) -> Error {
        error!("Failed to create challenge record {}: {}", fqdn, errors);
        Error::provider(self.provider.provider_name(), errors.to_string())
    }

    /// Poll until the record is visible, the deadline passes, or `cancel` fires
    async fn wait_for_record(
        &self,
        zone: &Zone,
        pair: &DomainChallenge,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let fqdn = pair.record_fqdn();
        let interval = self.propagation.poll_interval();
        let start = Instant::now();
        let deadline = start
            .checked_add(self.propagation.timeout())
            .ok_or_else(|| {
                Error::config(format!(
                    "Propagation timeout out of range: {:?}",
                    self.propagation.timeout()
                ))
            })?;

        info!("waiting for change: {}", pair.domain);
        self.emit_event(ResponderEvent::WaitingForPropagation {
            domain: pair.domain.clone(),
            record_name: fqdn.clone(),
        });

        loop {
            if self.provider.find_record(zone, &fqdn).await?.is_some() {
                let elapsed = start.elapsed();
                debug!("Record {} visible after {:?}", fqdn, elapsed);
                self.emit_event(ResponderEvent::Propagated {
                    domain: pair.domain.clone(),
                    record_name: fqdn,
                    elapsed,
                });
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                warn!("Gave up waiting for {} after {:?}", fqdn, start.elapsed());
                return Err(Error::PropagationTimeout {
                    record: fqdn,
                    waited: start.elapsed(),
                });
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Wait for {} cancelled", fqdn);
                    return Err(Error::Cancelled { record: fqdn });
                }

                _ = tokio::time::sleep(interval.min(deadline - now)) => {}
            }
        }
    }

    /// Remove the record of one challenge if it exists
    async fn remove(&self, pair: &DomainChallenge) -> Result<()> {
        let zone = self.zone_for(&pair.domain)?;
        let fqdn = pair.record_fqdn();

        match self.provider.find_record(zone, &fqdn).await? {
            Some(record) => {
                self.provider.delete_record(zone, &record.id).await?;
                info!("Removed challenge record {}", fqdn);
                self.emit_event(ResponderEvent::RecordRemoved {
                    domain: pair.domain.clone(),
                    record_name: fqdn,
                });
            }
            None => {
                debug!("No challenge record {} to remove", fqdn);
                self.emit_event(ResponderEvent::CleanupSkipped {
                    domain: pair.domain.clone(),
                    record_name: fqdn,
                });
            }
        }

        Ok(())
    }

    /// Emit a progress event
    fn emit_event(&self, event: ResponderEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            // Nobody listens; that is allowed.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

#[async_trait]
impl ChallengeResponder for DnsChallengeResponder {
    fn supports(&self, challenge_type: &str) -> bool {
        challenge_type == DNS01
    }

    fn supports_batch(&self) -> bool {
        true
    }

    async fn respond_all(&self, challenges: &[DomainChallenge]) -> Result<()> {
        // A token nobody holds never fires; only the deadline bounds the wait.
        self.respond_all_with_cancel(challenges, &CancellationToken::new())
            .await
    }

    /// Every pair is attempted; failures are reported together at the end.
    async fn cleanup_all(&self, challenges: &[DomainChallenge]) -> Result<()> {
        let mut failures = Vec::new();

        for pair in challenges {
            if let Err(e) = self.remove(pair).await {
                warn!("Cleanup failed for {}: {}", pair.domain, e);
                failures.push(e);
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(Error::Multiple(failures)),
        }
    }
}

/// Whether `zone` is `domain` itself or a label-aligned suffix of it
///
/// Comparison is ASCII case-insensitive and ignores one trailing dot.
pub fn zone_covers(zone: &str, domain: &str) -> bool {
    let zone = zone.strip_suffix('.').unwrap_or(zone).as_bytes();
    let domain = domain.strip_suffix('.').unwrap_or(domain).as_bytes();

    if zone.is_empty() || domain.len() < zone.len() {
        return false;
    }
    if domain.len() == zone.len() {
        return domain.eq_ignore_ascii_case(zone);
    }

    let split = domain.len() - zone.len();
    domain[split - 1] == b'.' && domain[split..].eq_ignore_ascii_case(zone)
}
