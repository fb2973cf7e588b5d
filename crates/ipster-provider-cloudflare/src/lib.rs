// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of `DnsProvider` for ipster:
// fetching the managed record and overwriting its content.
//
// ## Behavior
//
// - One zone lookup plus one record call per operation, nothing cached
// - Zone identifier resolved again for every fetch and every update
// - HTTP timeout configured (30 seconds)
// - Specific error mapping for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - Dry-run mode: lookups run, the PUT is only logged
// - No retry or backoff: errors go back to the engine, the next tick retries
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ipster_core::config::SyncConfig;
use ipster_core::traits::{DnsProvider, RecordSnapshot};
use ipster_core::{Error, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_NAME: &str = "cloudflare";

/// Cloudflare API response envelope
#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareApiError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CloudflareApiError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CloudflareZone {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CloudflareDnsRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    #[serde(default = "automatic_ttl")]
    ttl: u32,
    proxied: Option<bool>,
}

/// Full replacement body for PUT `/dns_records/:id`
#[derive(Debug, Serialize)]
struct UpdateRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxied: Option<bool>,
}

impl<'a> From<&'a RecordSnapshot> for UpdateRecordRequest<'a> {
    fn from(record: &'a RecordSnapshot) -> Self {
        Self {
            record_type: &record.record_type,
            name: &record.name,
            content: &record.content,
            ttl: record.ttl,
            proxied: record.proxied,
        }
    }
}

impl From<CloudflareDnsRecord> for RecordSnapshot {
    fn from(record: CloudflareDnsRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            content: record.content,
            record_type: record.record_type,
            ttl: record.ttl,
            proxied: record.proxied,
        }
    }
}

/// Cloudflare's "automatic" TTL
fn automatic_ttl() -> u32 {
    1
}

/// Cloudflare DNS provider for one zone and one record
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended PUT payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone containing the record
    zone_name: String,

    /// Fully qualified record name
    record_name: String,

    /// API base URL (overridable for testing)
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PUT updates
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_name", &self.zone_name)
            .field("record_name", &self.record_name)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_name`: Zone name, e.g. "example.com"
    /// - `record_name`: Record to manage, e.g. "home.example.com"
    /// - `dry_run`: If true, perform GET requests but skip PUT updates
    pub fn new(
        api_token: impl Into<String>,
        zone_name: impl Into<String>,
        record_name: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_name: zone_name.into(),
            record_name: record_name.into(),
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider for the configured zone and record
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        if config.dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }

        Self::new(
            config.api_token.clone(),
            config.zone_name.clone(),
            config.record_name.clone(),
            config.dry_run,
        )
    }

    /// Point the provider at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether updates are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Resolve the configured zone name to its zone ID
    ///
    /// The name filter is sent lowercased and the first zone returned is
    /// used. An empty result is `NotFound`.
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn get_zone_id(&self) -> Result<String> {
        tracing::debug!("Looking up zone ID for: {}", self.zone_name);

        let url = format!("{}/zones", self.api_base);
        let zone_filter = self.zone_name.to_lowercase();
        let request = self
            .client
            .get(&url)
            .query(&[("name", zone_filter.as_str())]);

        let zones: Vec<CloudflareZone> = self.send(request, "Zone lookup").await?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("Zone {}", self.zone_name)))?;

        tracing::debug!("Found zone {} ({})", zone.name, zone.id);
        Ok(zone.id)
    }

    /// List records in a zone filtered by the configured record name
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn list_records(&self, zone_id: &str) -> Result<Vec<CloudflareDnsRecord>> {
        tracing::debug!("Listing records named {} in zone {}", self.record_name, zone_id);

        let url = format!("{}/zones/{}/dns_records", self.api_base, zone_id);
        let request = self
            .client
            .get(&url)
            .query(&[("name", self.record_name.as_str())]);

        self.send(request, "Record lookup").await
    }

    /// Send an authenticated request and unwrap the Cloudflare envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", context, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text, context));
        }

        let envelope: CloudflareResponse<T> = response.json().await.map_err(|e| {
            Error::provider(
                PROVIDER_NAME,
                format!("Failed to parse {} response: {}", context, e),
            )
        })?;

        into_result(envelope, context)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn fetch_record(&self) -> Result<RecordSnapshot> {
        let zone_id = self.get_zone_id().await?;
        let records = self.list_records(&zone_id).await?;

        select_record(records, &self.record_name).ok_or_else(|| {
            Error::not_found(format!(
                "DNS record {} in zone {}",
                self.record_name, self.zone_name
            ))
        })
    }

    /// Overwrite a record with a full replacement
    ///
    /// # API Calls
    ///
    /// ```http
    /// GET /zones?name=example.com
    ///
    /// # Skipped in dry-run mode
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// { "type": "A", "name": "home.example.com", "content": "1.2.3.4", "ttl": 1, "proxied": false }
    /// ```
    async fn update_record(&self, record: &RecordSnapshot) -> Result<()> {
        let zone_id = self.get_zone_id().await?;

        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.api_base, zone_id, record.id
        );
        let payload = UpdateRecordRequest::from(record);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(&payload).unwrap_or_default()
            );
            return Ok(());
        }

        tracing::debug!("Updating record {} ({})", record.name, record.id);

        let request = self.client.put(&url).json(&payload);
        let _updated: CloudflareDnsRecord = self.send(request, "Record update").await?;

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Pick the first record whose name matches exactly
fn select_record(records: Vec<CloudflareDnsRecord>, record_name: &str) -> Option<RecordSnapshot> {
    records
        .into_iter()
        .find(|record| record.name == record_name)
        .map(RecordSnapshot::from)
}

/// Map a non-success HTTP status to an error
fn status_error(status: StatusCode, error_text: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{} returned {}", context, status)),
        409 => Error::provider(
            PROVIDER_NAME,
            format!(
                "Conflict: Record is being updated by another process. Status: {}",
                status
            ),
        ),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("Cloudflare server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("{} failed: {} - {}", context, status, error_text),
        ),
    }
}

/// Unwrap the `result` of a successful envelope
fn into_result<T>(envelope: CloudflareResponse<T>, context: &str) -> Result<T> {
    if !envelope.success {
        let errors = envelope
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.code, e.message))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::provider(
            PROVIDER_NAME,
            format!("{} rejected: {}", context, errors),
        ));
    }

    envelope.result.ok_or_else(|| {
        Error::provider(PROVIDER_NAME, format!("{} returned no result", context))
    })
}
