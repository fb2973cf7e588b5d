//! Reconcile engine
//!
//! The SyncEngine is responsible for:
//! - Resolving the current public IP and fetching the managed record concurrently
//! - Comparing the two and deciding whether the record must change
//! - Overwriting the record via DnsProvider when they differ
//! - Repeating the cycle on a fixed interval, one cycle at a time
//!
//! ## Architecture
//!
//! ```text
//!                   ┌──────────────┐
//!        tick ────▶ │  SyncEngine  │
//!                   └──────────────┘
//!                          │ join
//!            ┌─────────────┴─────────────┐
//!            ▼                           ▼
//!    ┌──────────────┐           ┌──────────────┐
//!    │  IpResolver  │           │ DnsProvider  │
//!    │  (resolve)   │           │  (fetch)     │
//!    └──────────────┘           └──────────────┘
//!            └─────────────┬─────────────┘
//!                          ▼
//!                   compare content
//!                          │ differs
//!                          ▼
//!                   ┌──────────────┐
//!                   │ DnsProvider  │
//!                   │  (update)    │
//!                   └──────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Resolve IP and fetch record concurrently, wait for both
//! 2. Fetch failed → abandon (checked first, even if resolve also failed)
//! 3. Resolve failed → abandon
//! 4. Content equals address (exact string match) → nothing to do
//! 5. Otherwise overwrite the record once, no retry within the cycle

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, IpResolver};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Capacity of the engine event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of one reconciliation cycle
///
/// Only exists for the duration of a cycle; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Record already holds the observed address
    NoChange {
        address: String,
    },

    /// Record was overwritten with the observed address
    Updated {
        record_id: String,
        previous: String,
        current: String,
    },

    /// The record could not be fetched (includes "record not found")
    FetchFailed(Error),

    /// The public IP could not be resolved
    ResolveFailed(Error),

    /// The record differed but the update call failed
    UpdateFailed(Error),
}

impl ReconcileOutcome {
    /// Whether the cycle was abandoned because of an error
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed(_) | Self::ResolveFailed(_) | Self::UpdateFailed(_)
        )
    }

    /// The error that abandoned the cycle, if any
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::FetchFailed(e) | Self::ResolveFailed(e) | Self::UpdateFailed(e) => Some(e),
            Self::NoChange { .. } | Self::Updated { .. } => None,
        }
    }
}

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Scheduler loop started
    Started {
        record_name: String,
        interval: Duration,
    },

    /// One reconciliation cycle finished
    CycleCompleted {
        cycle: u64,
        outcome: ReconcileOutcome,
    },

    /// Scheduler loop stopped
    Stopped {
        reason: String,
    },
}

/// Reconcile engine
///
/// Owns the resolver and the provider and runs the
/// resolve → fetch → compare → update cycle on a timer.
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Start with [`SyncEngine::run_until()`] or [`SyncEngine::run_with_shutdown()`]
/// 3. The first cycle runs immediately, then one per interval
/// 4. The loop stops between cycles once the shutdown future completes
///
/// ## Non-overlap
///
/// Cycles are awaited inline by the loop, so cycle N+1 never starts before
/// cycle N has finished. A cycle that overruns the interval delays the next
/// tick instead of producing a burst.
pub struct SyncEngine {
    /// Source of the desired state
    resolver: Box<dyn IpResolver>,

    /// Source of the observed state, and target of updates
    provider: Box<dyn DnsProvider>,

    /// Managed record (for logging)
    record_name: String,

    /// Delay between cycle starts
    check_interval: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Box<dyn IpResolver>,
        provider: Box<dyn DnsProvider>,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        if config.check_interval.is_zero() {
            return Err(Error::config("check interval must be greater than zero"));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            resolver,
            provider,
            record_name: config.record_name.clone(),
            check_interval: config.check_interval,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run one reconciliation cycle
    ///
    /// Never returns an error: every failure is logged and folded into the
    /// returned outcome so the caller can simply move on to the next tick.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        let (observation, snapshot) =
            tokio::join!(self.resolver.resolve(), self.provider.fetch_record());

        let record = match snapshot {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to fetch record {}: {}", self.record_name, e);
                return ReconcileOutcome::FetchFailed(e);
            }
        };

        let observation = match observation {
            Ok(observation) => observation,
            Err(e) => {
                error!(
                    "Failed to resolve public IP via {}: {}",
                    self.resolver.resolver_name(),
                    e
                );
                return ReconcileOutcome::ResolveFailed(e);
            }
        };

        // Raw string comparison, no normalization.
        if record.content == observation.address {
            info!("No IP change ({} = {})", record.name, observation.address);
            return ReconcileOutcome::NoChange {
                address: observation.address,
            };
        }

        info!(
            "IPs do not match ({}: {} -> {}). Updating...",
            record.name, record.content, observation.address
        );

        let updated = record.with_content(observation.address.as_str());
        match self.provider.update_record(&updated).await {
            Ok(()) => {
                info!("Record updated: {} -> {}", updated.name, updated.content);
                ReconcileOutcome::Updated {
                    record_id: record.id,
                    previous: record.content,
                    current: updated.content,
                }
            }
            Err(e) => {
                error!(
                    "Failed to update record {} via {}: {}",
                    record.name,
                    self.provider.provider_name(),
                    e
                );
                ReconcileOutcome::UpdateFailed(e)
            }
        }
    }

    /// Run the scheduler until `shutdown` completes
    ///
    /// The first cycle starts immediately. Shutdown is only observed between
    /// cycles; an in-flight cycle always runs to completion.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Keeping {} in sync every {:?}",
            self.record_name, self.check_interval
        );
        self.emit_event(EngineEvent::Started {
            record_name: self.record_name.clone(),
            interval: self.check_interval,
        });

        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        let mut cycle: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }

                _ = ticker.tick() => {}
            }

            cycle += 1;
            debug!("Starting cycle {}", cycle);
            let outcome = self.reconcile().await;
            self.emit_event(EngineEvent::CycleCompleted { cycle, outcome });
        }
    }

    /// Run the scheduler with a programmatic shutdown channel
    ///
    /// Dropping the sender counts as a shutdown request.
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<()>) {
        self.run_until(async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    /// Emit an engine event without blocking the loop
    ///
    /// A full channel drops the event with a warning; a closed channel means
    /// nobody is listening and is ignored.
    fn emit_event(&self, event: EngineEvent) {
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consumer is not keeping up.");
        }
    }
}
