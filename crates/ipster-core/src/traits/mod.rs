//! Core traits for the ipster synchronizer
//!
//! - [`IpResolver`]: learn the host's current public IP (desired state)
//! - [`DnsProvider`]: read and overwrite the managed record (observed state)

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::{IpObservation, IpResolver};
pub use dns_provider::{DnsProvider, RecordSnapshot};
