// # ipster-core
//
// Core library for the ipster dynamic DNS synchronizer.
//
// ## Architecture Overview
//
// ipster keeps one DNS record pointed at the host's public IP:
// - **IpResolver**: Trait for learning the current public IP (desired state)
// - **DnsProvider**: Trait for fetching and overwriting the record (observed state)
// - **SyncEngine**: Runs the resolve/fetch/compare/update cycle on a timer
// - **SyncConfig**: Immutable configuration read once at startup
//
// ## Design Principles
//
// 1. **Stateless cycles**: Both sides of the comparison are re-fetched every cycle
// 2. **Error isolation**: A failing cycle is logged and abandoned, never fatal
// 3. **No overlap**: One cycle at a time, at most two concurrent remote calls
// 4. **Library-First**: The daemon is a thin wrapper around this crate

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DnsProvider, IpObservation, IpResolver, RecordSnapshot};
pub use engine::{EngineEvent, ReconcileOutcome, SyncEngine};
pub use config::{ConfigError, SyncConfig};
pub use error::{Error, Result};
