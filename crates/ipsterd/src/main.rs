// # ipsterd - ipster daemon
//
// Keeps one Cloudflare DNS record in sync with this machine's public IP.
//
// This is a THIN integration layer: the reconcile loop lives in ipster-core.
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Reporting configuration problems with distinct exit codes
// 3. Initializing logging and the runtime
// 4. Wiring the resolver and provider into the engine and running it
//
// ## Configuration
//
// ### Required
// - `IPSTER_CLOUDFLARE_API_TOKEN`: Cloudflare API token (Edit zone DNS)
// - `IPSTER_CLOUDFLARE_ZONE_NAME`: Zone name, e.g. example.com
// - `IPSTER_CLOUDFLARE_DNS_RECORD_NAME`: Record to keep in sync, e.g. home.example.com
//
// ### Optional
// - `IPSTER_CHECK_INTERVAL_MS`: Poll interval in milliseconds (default 60000)
// - `IPSTER_IP_API_URL`: IP echo endpoint (default http://ip-api.com/json/)
// - `IPSTER_MODE`: `dry-run` to log updates instead of applying them
// - `IPSTER_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Exit Codes
//
// | code | meaning |
// |------|---------|
// | 0 | shutdown on SIGINT/SIGTERM |
// | 1 | missing API token |
// | 2 | missing zone name |
// | 3 | missing record name |
// | 4 | invalid check interval |
// | 5 | invalid log level |
// | 6 | startup or runtime failure |

use anyhow::{Context, Result};
use ipster_core::{EngineEvent, SyncConfig, SyncEngine};
use ipster_ip_http::HttpIpResolver;
use ipster_provider_cloudflare::CloudflareProvider;
use std::env;
use std::process::ExitCode;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Log level (optional)
const ENV_LOG_LEVEL: &str = "IPSTER_LOG_LEVEL";

const USAGE: &str = "\
ipster keeps your Cloudflare DNS record in sync with this machine's IP

Please set the following environment variables:
    * IPSTER_CLOUDFLARE_API_TOKEN - your Cloudflare API token https://dash.cloudflare.com/profile/api-tokens (use the Edit zone DNS template)
    * IPSTER_CLOUDFLARE_ZONE_NAME - your Cloudflare zone name, usually your domain name e.g. example.com
    * IPSTER_CLOUDFLARE_DNS_RECORD_NAME - the DNS record to keep in sync e.g. home.example.com

Optional:
    * IPSTER_CHECK_INTERVAL_MS - poll interval in milliseconds (default 60000)
    * IPSTER_LOG_LEVEL - trace, debug, info, warn or error (default info)
    * IPSTER_MODE - set to dry-run to log updates without applying them

Example call:
    IPSTER_CLOUDFLARE_API_TOKEN=xxxxxxxxx_yyyyyyyyyyyyyyyyyyyyyy IPSTER_CLOUDFLARE_ZONE_NAME=example.com IPSTER_CLOUDFLARE_DNS_RECORD_NAME=home.example.com ipsterd";

/// Exit codes not covered by `ConfigError::exit_code()`
#[derive(Debug, Clone, Copy)]
enum IpsterExitCode {
    /// Clean shutdown (signal received)
    CleanShutdown = 0,
    /// IPSTER_LOG_LEVEL is not a known level
    InvalidLogLevel = 5,
    /// Startup or runtime failure
    RuntimeError = 6,
}

impl From<IpsterExitCode> for ExitCode {
    fn from(code: IpsterExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load and validate configuration before anything touches the network
    let config = match SyncConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            if e.is_missing_value() {
                eprintln!("{}\n\n{}", e, USAGE);
            } else {
                eprintln!("Configuration error: {}", e);
            }
            return ExitCode::from(e.exit_code());
        }
    };

    let raw_level = env::var(ENV_LOG_LEVEL).unwrap_or_default();
    let Some(log_level) = parse_log_level(&raw_level) else {
        eprintln!(
            "IPSTER_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            raw_level
        );
        return IpsterExitCode::InvalidLogLevel.into();
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IpsterExitCode::RuntimeError.into();
    }

    info!("Starting ipsterd: {}", startup_summary(&config));
    if !record_in_zone(&config.record_name, &config.zone_name) {
        warn!(
            "Record {} does not belong to zone {}; the record lookup will likely fail",
            config.record_name, config.zone_name
        );
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IpsterExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(&config).await {
            Ok(signal) => {
                info!("Received shutdown signal: {}", signal);
                IpsterExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Daemon error: {:#}", e);
                IpsterExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Build the components and run the engine until a shutdown signal
async fn run_daemon(config: &SyncConfig) -> Result<&'static str> {
    let resolver = HttpIpResolver::from_config(config).context("Failed to create IP resolver")?;
    info!("Resolving public IP via {}", resolver.url());
    let provider =
        CloudflareProvider::from_config(config).context("Failed to create Cloudflare provider")?;

    let (engine, mut events) = SyncEngine::new(Box::new(resolver), Box::new(provider), config)
        .context("Failed to create sync engine")?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::CycleCompleted { cycle, outcome } if outcome.is_failure() => {
                    debug!("Cycle {} abandoned: {:?}", cycle, outcome.error());
                }
                other => debug!("Engine event: {:?}", other),
            }
        }
    });

    let mut shutdown = Ok("none");
    engine
        .run_until(async {
            shutdown = wait_for_shutdown().await;
        })
        .await;

    shutdown
}

/// Parse a log level name; empty means the default (info)
fn parse_log_level(raw: &str) -> Option<Level> {
    match raw.to_lowercase().as_str() {
        "" | "info" => Some(Level::INFO),
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// One-line summary of the settings that matter to an operator
fn startup_summary(config: &SyncConfig) -> String {
    format!(
        "record {} in zone {}, every {:?}{}",
        config.record_name,
        config.zone_name,
        config.check_interval,
        if config.dry_run { " (dry-run)" } else { "" }
    )
}

/// Whether `record` is the zone apex or a name under `zone`
fn record_in_zone(record: &str, zone: &str) -> bool {
    let record = record.trim_end_matches('.').to_lowercase();
    let zone = zone.trim_end_matches('.').to_lowercase();
    record == zone || record.ends_with(&format!(".{}", zone))
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
