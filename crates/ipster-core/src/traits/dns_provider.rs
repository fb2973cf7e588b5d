// # DNS Provider Trait
//
// Defines the interface for reading and overwriting the one managed record.
//
// ## Implementations
//
// - Cloudflare: `ipster-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ipster_core::DnsProvider;
//
// let record = provider.fetch_record().await?;
// if record.content != observed {
//     provider.update_record(&record.with_content(observed)).await?;
// }
// ```

use async_trait::async_trait;

/// The managed record as currently stored by the provider
///
/// Carries everything needed to write the record back as a full replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    /// Provider-assigned record identifier
    pub id: String,
    /// Fully qualified record name
    pub name: String,
    /// Current value (normally an IP address)
    pub content: String,
    /// Record type, e.g. "A"
    pub record_type: String,
    /// Time-to-live (provider-specific, 1 = automatic on Cloudflare)
    pub ttl: u32,
    /// Whether the record is proxied by the provider
    pub proxied: Option<bool>,
}

impl RecordSnapshot {
    /// Copy of this record with new content and the same identifier
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}

/// Trait for DNS provider implementations
///
/// A provider is constructed for exactly one zone and one record name.
///
/// # Contract
///
/// - Stateless: nothing is cached between calls, the zone identifier is
///   resolved again on every call
/// - Single-shot: no retry or backoff, errors are returned to the engine
/// - Never decides whether an update is needed (owned by `SyncEngine`)
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch the configured record
    ///
    /// Resolves the zone, lists records filtered by name, and returns the
    /// first record whose name equals the configured name exactly.
    ///
    /// # Returns
    ///
    /// - `Ok(RecordSnapshot)`: The record's current state
    /// - `Err(Error::NotFound)`: The zone or record does not exist
    /// - `Err(Error)`: Any other remote failure
    async fn fetch_record(&self) -> Result<RecordSnapshot, crate::Error>;

    /// Overwrite a record
    ///
    /// Issues a full replacement of the record identified by `record.id`
    /// with the supplied content.
    async fn update_record(&self, record: &RecordSnapshot) -> Result<(), crate::Error>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}
