//! Test doubles and common utilities for responder contract tests
//!
//! The mock provider keeps zones and records in memory and behaves like a
//! provider that refuses a second record with the same name.

#![allow(dead_code)]

use acme_dns_core::config::{PropagationConfig, ResponderConfig};
use acme_dns_core::error::{Error, Result};
use acme_dns_core::traits::{
    ApiErrors, ApiMessage, CreateOutcome, Dns01Challenge, DnsProvider, DnsRecord, DomainChallenge,
    NewRecord, Zone,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Provider error code for "record already exists"
pub const ALREADY_EXISTS: u32 = 81057;

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindZone(String),
    Create(NewRecord),
    FindRecord(String),
    Delete(String),
}

#[derive(Default)]
struct MockState {
    zones: Vec<Zone>,
    /// (zone id, record)
    records: Vec<(String, DnsRecord)>,
    calls: Vec<Call>,
    /// Outcomes returned by create_record before the default behaviour applies
    scripted_creates: VecDeque<CreateOutcome>,
    /// Number of record lookups answered with "not found" regardless of state
    hidden_lookups: usize,
    fail_deletes: bool,
    next_id: usize,
}

/// In-memory DnsProvider that records every call
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockDnsProvider {
    /// Create a provider that knows the given zones
    pub fn with_zones(names: &[&str]) -> Self {
        let provider = Self::default();
        {
            let mut state = provider.state.lock().unwrap();
            for (i, name) in names.iter().enumerate() {
                state.zones.push(Zone::new(format!("zone-{}", i), *name));
            }
        }
        provider
    }

    /// Seed an existing record into a zone
    pub fn seed_record(&self, zone_name: &str, name: &str, content: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let zone_id = state
            .zones
            .iter()
            .find(|z| z.name == zone_name)
            .map(|z| z.id.clone())
            .expect("seeded zone exists");
        state.next_id += 1;
        let id = format!("seed-{}", state.next_id);
        state.records.push((
            zone_id,
            DnsRecord {
                id: id.clone(),
                name: name.to_string(),
                record_type: "TXT".to_string(),
                content: content.to_string(),
                ttl: Some(120),
            },
        ));
        id
    }

    /// Queue an outcome for the next create_record call
    pub fn script_create(&self, outcome: CreateOutcome) {
        self.state.lock().unwrap().scripted_creates.push_back(outcome);
    }

    /// Answer the next `n` record lookups with "not found"
    pub fn hide_records_for(&self, n: usize) {
        self.state.lock().unwrap().hidden_lookups = n;
    }

    /// Make every delete fail
    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_deletes = true;
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Create calls made so far
    pub fn creates(&self) -> Vec<NewRecord> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    /// Record ids deleted so far
    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Names of the records currently stored
    pub fn record_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .map(|(_, r)| r.name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::FindZone(name.to_string()));
        Ok(state.zones.iter().find(|z| z.name == name).cloned())
    }

    async fn create_record(&self, zone: &Zone, record: &NewRecord) -> Result<CreateOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(record.clone()));

        if let Some(outcome) = state.scripted_creates.pop_front() {
            return Ok(outcome);
        }

        let exists = state
            .records
            .iter()
            .any(|(zone_id, r)| *zone_id == zone.id && r.name == record.name);
        if exists {
            return Ok(CreateOutcome::Conflict(ApiErrors(vec![ApiMessage {
                code: ALREADY_EXISTS,
                message: "Record already exists.".to_string(),
            }])));
        }

        state.next_id += 1;
        let created = DnsRecord {
            id: format!("rec-{}", state.next_id),
            name: record.name.clone(),
            record_type: record.record_type.clone(),
            content: record.content.clone(),
            ttl: Some(record.ttl),
        };
        state.records.push((zone.id.clone(), created.clone()));
        Ok(CreateOutcome::Created(created))
    }

    async fn find_record(&self, zone: &Zone, name: &str) -> Result<Option<DnsRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::FindRecord(name.to_string()));

        if state.hidden_lookups > 0 {
            state.hidden_lookups -= 1;
            return Ok(None);
        }

        Ok(state
            .records
            .iter()
            .find(|(zone_id, r)| *zone_id == zone.id && r.name == name)
            .map(|(_, r)| r.clone()))
    }

    async fn delete_record(&self, _zone: &Zone, record_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(record_id.to_string()));

        if state.fail_deletes {
            return Err(Error::provider("mock", "1000: delete refused"));
        }

        state.records.retain(|(_, r)| r.id != record_id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Build a rejection with one provider message
pub fn rejected(code: u32, message: &str) -> CreateOutcome {
    CreateOutcome::Rejected(ApiErrors(vec![ApiMessage {
        code,
        message: message.to_string(),
    }]))
}

/// A `_acme-challenge` TXT challenge for a domain
pub fn challenge(domain: &str, content: &str) -> DomainChallenge {
    DomainChallenge::new(domain, Dns01Challenge::new("_acme-challenge", content))
}

/// Helper to create a minimal ResponderConfig for testing
pub fn minimal_config(zones: &[&str]) -> ResponderConfig {
    ResponderConfig::new(zones.iter().copied())
        .with_ttl(120)
        .with_propagation(PropagationConfig {
            poll_interval_ms: 10,
            timeout_secs: 2,
        })
}
