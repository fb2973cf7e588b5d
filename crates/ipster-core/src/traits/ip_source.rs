// # IP Resolver Trait
//
// Defines the interface for learning the host's current public IP address.
//
// ## Implementations
//
// - HTTP JSON echo service: `ipster-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ipster_core::IpResolver;
//
// let observation = resolver.resolve().await?;
// println!("public address: {}", observation.address);
// ```

use async_trait::async_trait;

/// The caller's public address as reported by a resolver
///
/// Produced once per cycle and discarded when the cycle ends. A failed
/// resolution is an `Err`, so an observation always holds a usable address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpObservation {
    /// Textual address exactly as the upstream service returned it
    pub address: String,
}

impl IpObservation {
    /// Create a new observation
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// Trait for IP resolver implementations
///
/// # Contract
///
/// - One bounded-timeout request per call
/// - No retries; the next scheduled cycle is the retry
/// - No caching between calls
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpObservation)`: The address reported by the upstream service
    /// - `Err(Error)`: Network failure, non-200 status, or malformed body
    async fn resolve(&self) -> Result<IpObservation, crate::Error>;

    /// Resolver name (for logging)
    fn resolver_name(&self) -> &'static str;
}
