//! Test doubles and common utilities for engine contract tests
//!
//! The doubles are cheap to clone: clones share their call counters and
//! recorded calls, so a test can hand one copy to the engine and keep
//! another for assertions.

#![allow(dead_code)]

use ipster_core::engine::EngineEvent;
use ipster_core::error::{Error, Result};
use ipster_core::traits::{DnsProvider, IpObservation, IpResolver, RecordSnapshot};
use ipster_core::{ReconcileOutcome, SyncConfig};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const RECORD_NAME: &str = "home.example.com";
pub const RECORD_ID: &str = "372e67954025e0ba6aaa6d586b9e0b59";

/// An IpResolver that replays scripted results
///
/// Results are consumed in order; once the script is exhausted the fallback
/// result is returned forever.
#[derive(Clone)]
pub struct ScriptedIpResolver {
    script: Arc<Mutex<VecDeque<Result<IpObservation>>>>,
    fallback: Result<IpObservation>,
    delay: Duration,
    resolve_call_count: Arc<AtomicUsize>,
}

impl ScriptedIpResolver {
    /// Always resolve to `address`
    pub fn returning(address: &str) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Ok(IpObservation::new(address)),
            delay: Duration::ZERO,
            resolve_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always fail with `error`
    pub fn failing(error: Error) -> Self {
        Self {
            fallback: Err(error),
            ..Self::returning("")
        }
    }

    /// Return `first` on the first calls, then the fallback
    pub fn then(self, first: Vec<Result<IpObservation>>) -> Self {
        *self.script.lock().unwrap() = first.into();
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times resolve() was called
    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for ScriptedIpResolver {
    async fn resolve(&self) -> Result<IpObservation> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// A DnsProvider backed by an in-memory record that tracks calls
#[derive(Clone)]
pub struct MockDnsProvider {
    /// Current record, or the error fetch_record() returns
    record: Arc<Mutex<Result<RecordSnapshot>>>,
    /// Error update_record() returns, if any
    update_error: Option<Error>,
    fetch_delay: Duration,
    fetch_call_count: Arc<AtomicUsize>,
    /// Records passed to update_record()
    updates: Arc<Mutex<Vec<RecordSnapshot>>>,
    /// Fetches currently running, and the maximum ever observed
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    /// Start time of every fetch
    fetch_started_at: Arc<Mutex<Vec<Instant>>>,
}

impl MockDnsProvider {
    /// Provider whose record currently holds `content`
    pub fn with_content(content: &str) -> Self {
        Self::with_fetch_result(Ok(snapshot(content)))
    }

    /// Provider whose fetch always returns `result` until an update lands
    pub fn with_fetch_result(result: Result<RecordSnapshot>) -> Self {
        Self {
            record: Arc::new(Mutex::new(result)),
            update_error: None,
            fetch_delay: Duration::ZERO,
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            fetch_started_at: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every update fail with `error`
    pub fn failing_updates(mut self, error: Error) -> Self {
        self.update_error = Some(error);
        self
    }

    /// Sleep inside fetch_record()
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn updates(&self) -> Vec<RecordSnapshot> {
        self.updates.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetch_started_at(&self) -> Vec<Instant> {
        self.fetch_started_at.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn fetch_record(&self) -> Result<RecordSnapshot> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        self.fetch_started_at.lock().unwrap().push(Instant::now());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.record.lock().unwrap().clone()
    }

    async fn update_record(&self, record: &RecordSnapshot) -> Result<()> {
        self.updates.lock().unwrap().push(record.clone());

        if let Some(error) = &self.update_error {
            return Err(error.clone());
        }

        *self.record.lock().unwrap() = Ok(record.clone());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// The managed record holding `content`
pub fn snapshot(content: &str) -> RecordSnapshot {
    RecordSnapshot {
        id: RECORD_ID.to_string(),
        name: RECORD_NAME.to_string(),
        content: content.to_string(),
        record_type: "A".to_string(),
        ttl: 1,
        proxied: Some(false),
    }
}

/// Minimal configuration for tests
pub fn minimal_config(interval: Duration) -> SyncConfig {
    SyncConfig::new("test-token", "example.com", RECORD_NAME).with_check_interval(interval)
}

/// Receive events until `count` cycles completed, returning their outcomes
pub async fn collect_cycles(
    events: &mut mpsc::Receiver<EngineEvent>,
    count: usize,
) -> Vec<(u64, ReconcileOutcome)> {
    let mut cycles = Vec::with_capacity(count);
    while cycles.len() < count {
        match events.recv().await {
            Some(EngineEvent::CycleCompleted { cycle, outcome }) => cycles.push((cycle, outcome)),
            Some(_) => {}
            None => panic!("engine stopped after {} cycles", cycles.len()),
        }
    }
    cycles
}
