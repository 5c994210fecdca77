// # duckdnsd - DuckDNS updater daemon
//
// The duckdnsd daemon is a thin integration layer. It is responsible for:
// 1. Parsing command-line flags
// 2. Loading configuration (YAML file + environment overrides)
// 3. Initializing logging and the runtime
// 4. Turning SIGINT/SIGTERM into cancellation
// 5. Wiring the IP sources, the DuckDNS client and the scheduler together
//
// With `--once` it skips the scheduler: one update (with retry), then exit.
//
// All update logic lives in duckdns-core and the provider/source crates.
//
// ## Configuration
//
// A YAML file passed with `--config` (or `DUCKDNS_CONFIG`), overridden by:
//
// - `DUCKDNS_DOMAIN`: DuckDNS subdomain (required)
// - `DUCKDNS_TOKEN`: DuckDNS token (required)
// - `DUCKDNS_INTERVAL`: Check interval, e.g. `5m`, `1h` (default: 5m)
// - `DUCKDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `DUCKDNS_LOG_FORMAT`: text or json (default: text)
//
// ## Example
//
// ```bash
// export DUCKDNS_DOMAIN=my-domain
// export DUCKDNS_TOKEN=your-token
//
// duckdnsd --config /etc/duckdns/config.yaml
//
// # single update, explicit address
// duckdnsd --once --ip 203.0.113.7
// ```

mod settings;

use anyhow::Result;
use clap::Parser;
use duckdns_core::{AppConfig, DnsProvider, IpSource, Scheduler, SchedulerConfig};
use duckdns_ip_http::FailoverIpSource;
use duckdns_provider::DuckDnsClient;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep a DuckDNS domain pointed at this host's public IPv4 address
#[derive(Debug, Parser)]
#[command(name = "duckdnsd", version, about)]
struct Cli {
    /// Path to a YAML configuration file; environment variables override it
    #[arg(short, long, env = "DUCKDNS_CONFIG")]
    config: Option<PathBuf>,

    /// Send a single update and exit instead of running the scheduler
    #[arg(long)]
    once: bool,

    /// Address to publish with --once (default: ask the configured IP sources)
    #[arg(long, requires = "once", value_parser = parse_ip)]
    ip: Option<Ipv4Addr>,

    /// Log at debug level, whatever the configuration says
    #[arg(short, long)]
    verbose: bool,
}

fn parse_ip(text: &str) -> std::result::Result<Ipv4Addr, String> {
    duckdns_ip_http::validate_ipv4(text).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let config = match settings::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let level = if cli.verbose { "debug" } else { config.log.level.as_str() };
    if let Err(e) = init_tracing(level, &config.log.format) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = ?cli.config,
        log_level = %level,
        log_format = %config.log.format,
        "starting duckdnsd"
    );
    info!(
        domain = %config.duckdns.domain,
        interval = %duckdns_core::duration::format_duration(config.update.interval),
        ip_sources = config.ip_sources.len(),
        "configuration loaded"
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let run = if cli.once {
            run_once(config, cli.ip).await
        } else {
            run_daemon(config).await
        };
        if let Err(e) = run {
            error!("Daemon error: {:#}", e);
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Map a configured level name to a tracing level
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global tracing subscriber
fn init_tracing(level: &str, format: &str) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(true);

    if format.eq_ignore_ascii_case("json") {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: AppConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    let signal_task = spawn_signal_handler(cancel.clone());

    let ip_source = FailoverIpSource::with_timeout(config.ip_sources.clone(), config.update.timeout);
    let provider = DuckDnsClient::from_config(&config.update);
    let scheduler_config = SchedulerConfig::new(
        config.update.interval,
        config.duckdns.domain.clone(),
        config.duckdns.token.clone(),
    );

    let (mut scheduler, mut events) =
        Scheduler::new(Box::new(ip_source), Box::new(provider), scheduler_config)?;

    // Events are already logged by the scheduler; keep the channel drained
    let event_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::trace!(?event, "scheduler event");
        }
    });

    scheduler.run(cancel.clone()).await;

    signal_task.abort();
    drop(scheduler);
    let _ = event_task.await;

    info!("Scheduler stopped, exiting");
    Ok(())
}

/// Publish one address and exit
///
/// Uses `ip` when given, otherwise the configured IP sources. The update goes
/// through the client's retry policy; a signal aborts it.
async fn run_once(config: AppConfig, ip: Option<Ipv4Addr>) -> Result<()> {
    let cancel = CancellationToken::new();
    let signal_task = spawn_signal_handler(cancel.clone());

    let provider = DuckDnsClient::from_config(&config.update);
    let result = publish_once(&config, &provider, ip, &cancel).await.map(|_| ());

    signal_task.abort();
    result
}

async fn publish_once(
    config: &AppConfig,
    provider: &dyn DnsProvider,
    ip: Option<Ipv4Addr>,
    cancel: &CancellationToken,
) -> Result<Ipv4Addr> {
    let ip = match ip {
        Some(ip) => ip,
        None => {
            FailoverIpSource::with_timeout(config.ip_sources.clone(), config.update.timeout)
                .current(cancel)
                .await?
        }
    };

    provider
        .update_record_with_retry(cancel, &config.duckdns.domain, &config.duckdns.token, ip)
        .await?;

    info!(domain = %config.duckdns.domain, %ip, "DuckDNS update successful");
    Ok(ip)
}

/// Cancel `cancel` on the first shutdown signal
fn spawn_signal_handler(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => {
                info!("Received shutdown signal: {}", signal);
                info!("Starting graceful shutdown");
            }
            Err(e) => error!("Signal handling failed, shutting down: {:#}", e),
        }
        cancel.cancel();
    })
}

/// Wait for a shutdown signal (SIGTERM or SIGINT)
///
/// # Returns
///
/// The name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for a shutdown signal (Ctrl-C)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
