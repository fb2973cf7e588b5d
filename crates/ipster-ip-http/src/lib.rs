// # HTTP IP Resolver
//
// This crate provides an HTTP-based IP resolver for ipster.
//
// ## Architecture
//
// Asks an external JSON echo service (ip-api.com by default) for the
// caller's public address. One GET per cycle, 5 second timeout, no retry
// and no caching: the engine's next tick is the retry.
//
// ## Response Format
//
// ```json
// { "status": "success", "query": "203.0.113.7", ... }
// ```
//
// Only `query` is required. Anything other than HTTP 200 with a non-empty
// JSON body carrying a non-empty `query` string is a failure.

use ipster_core::config::SyncConfig;
use ipster_core::traits::{IpObservation, IpResolver};
use ipster_core::{Error, Result};

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Timeout for one lookup
pub const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Subset of the echo service response we care about
#[derive(Debug, Deserialize)]
struct EchoResponse {
    /// The caller's address
    query: Option<String>,
    /// "success" or "fail"
    status: Option<String>,
    /// Failure reason when status is "fail"
    message: Option<String>,
}

/// HTTP-based IP resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL of the echo service
    url: String,

    /// HTTP client (carries the lookup timeout)
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a new HTTP IP resolver
    ///
    /// # Parameters
    ///
    /// - `url`: Echo service URL (e.g., "http://ip-api.com/json/")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(IP_LOOKUP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create a resolver for the configured echo service
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(config.ip_api_url.clone())
    }

    /// The echo service URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<IpObservation> {
        tracing::debug!("Resolving public IP via {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request failed: {}", e)))?;

        ensure_ok(response.status())?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_source(format!("Failed to read response: {}", e)))?;

        let observation = parse_echo_body(&body)?;
        tracing::debug!("Public IP is {}", observation.address);
        Ok(observation)
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}

/// Only an exact 200 counts as success
fn ensure_ok(status: StatusCode) -> Result<()> {
    if status != StatusCode::OK {
        return Err(Error::ip_source(format!("unexpected status {}", status)));
    }
    Ok(())
}

/// Extract the address from an echo service body
fn parse_echo_body(body: &str) -> Result<IpObservation> {
    if body.trim().is_empty() {
        return Err(Error::ip_source("empty response body"));
    }

    let echo: EchoResponse = serde_json::from_str(body)
        .map_err(|e| Error::ip_source(format!("Malformed response: {}", e)))?;

    match echo.query {
        Some(address) if !address.is_empty() => Ok(IpObservation::new(address)),
        _ => {
            let reason = match (echo.status.as_deref(), echo.message) {
                (Some("fail"), Some(message)) => format!("lookup failed: {}", message),
                _ => "response has no address".to_string(),
            };
            Err(Error::ip_source(reason))
        }
    }
}
