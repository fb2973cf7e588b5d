//! Configuration for the ipster synchronizer
//!
//! The configuration is read once from the process environment, validated
//! before the first cycle, and then handed by reference to every component
//! constructor. Nothing reads the environment after startup.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Cloudflare API token (required)
pub const ENV_API_TOKEN: &str = "IPSTER_CLOUDFLARE_API_TOKEN";

/// Cloudflare zone name, e.g. `example.com` (required)
pub const ENV_ZONE_NAME: &str = "IPSTER_CLOUDFLARE_ZONE_NAME";

/// DNS record to keep in sync, e.g. `home.example.com` (required)
pub const ENV_RECORD_NAME: &str = "IPSTER_CLOUDFLARE_DNS_RECORD_NAME";

/// Poll interval in milliseconds (optional)
pub const ENV_CHECK_INTERVAL_MS: &str = "IPSTER_CHECK_INTERVAL_MS";

/// Override for the IP echo endpoint (optional)
pub const ENV_IP_API_URL: &str = "IPSTER_IP_API_URL";

/// Set to `dry-run` to skip record mutations (optional)
pub const ENV_MODE: &str = "IPSTER_MODE";

/// Default poll interval (1 minute)
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(60_000);

/// Default IP echo endpoint
pub const DEFAULT_IP_API_URL: &str = "http://ip-api.com/json/";

/// Configuration errors detected at startup
///
/// Each variant maps to a distinct, stable process exit code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("IPSTER_CLOUDFLARE_API_TOKEN is required")]
    MissingApiToken,

    #[error("IPSTER_CLOUDFLARE_ZONE_NAME is required")]
    MissingZoneName,

    #[error("IPSTER_CLOUDFLARE_DNS_RECORD_NAME is required")]
    MissingRecordName,

    #[error("Invalid IPSTER_CHECK_INTERVAL_MS '{value}': {reason}")]
    InvalidInterval {
        /// The raw value found in the environment
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            ConfigError::MissingApiToken => 1,
            ConfigError::MissingZoneName => 2,
            ConfigError::MissingRecordName => 3,
            ConfigError::InvalidInterval { .. } => 4,
        }
    }

    /// Whether a required value is absent (as opposed to malformed)
    pub fn is_missing_value(&self) -> bool {
        !matches!(self, ConfigError::InvalidInterval { .. })
    }
}

/// Process-wide synchronizer configuration
///
/// Immutable once built. The `Debug` output never contains the API token.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Cloudflare API token
    pub api_token: String,

    /// Zone containing the record
    pub zone_name: String,

    /// Fully qualified record name
    pub record_name: String,

    /// Fixed delay between cycle starts
    pub check_interval: Duration,

    /// IP echo endpoint
    pub ip_api_url: String,

    /// Perform lookups but skip record mutations
    pub dry_run: bool,
}

impl SyncConfig {
    /// Create a configuration with default interval and endpoint
    pub fn new(
        api_token: impl Into<String>,
        zone_name: impl Into<String>,
        record_name: impl Into<String>,
    ) -> Self {
        Self {
            api_token: api_token.into(),
            zone_name: zone_name.into(),
            record_name: record_name.into(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            ip_api_url: DEFAULT_IP_API_URL.to_string(),
            dry_run: false,
        }
    }

    /// Set the poll interval
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// Set the IP echo endpoint
    pub fn with_ip_api_url(mut self, url: impl Into<String>) -> Self {
        self.ip_api_url = url.into();
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated as absent. Required values are checked in a
    /// fixed order (token, zone, record, interval) so the reported error is
    /// stable when several are missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let api_token = get(ENV_API_TOKEN).ok_or(ConfigError::MissingApiToken)?;
        let zone_name = get(ENV_ZONE_NAME).ok_or(ConfigError::MissingZoneName)?;
        let record_name = get(ENV_RECORD_NAME).ok_or(ConfigError::MissingRecordName)?;

        let check_interval = match get(ENV_CHECK_INTERVAL_MS) {
            Some(raw) => parse_interval_ms(&raw)?,
            None => DEFAULT_CHECK_INTERVAL,
        };

        let ip_api_url = get(ENV_IP_API_URL).unwrap_or_else(|| DEFAULT_IP_API_URL.to_string());
        let dry_run = get(ENV_MODE).is_some_and(|mode| mode.eq_ignore_ascii_case("dry-run"));

        Ok(Self {
            api_token,
            zone_name,
            record_name,
            check_interval,
            ip_api_url,
            dry_run,
        })
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("api_token", &"<REDACTED>")
            .field("zone_name", &self.zone_name)
            .field("record_name", &self.record_name)
            .field("check_interval", &self.check_interval)
            .field("ip_api_url", &self.ip_api_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

fn parse_interval_ms(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidInterval {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let millis: u64 = raw
        .parse()
        .map_err(|_| invalid("expected a whole number of milliseconds"))?;

    if millis == 0 {
        return Err(invalid("must be greater than zero"));
    }

    Ok(Duration::from_millis(millis))
}
