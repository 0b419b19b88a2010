//! solo - single-instance demo application
//!
//! Probes this host (or the LAN) for a running instance of the same
//! application and exits early when one answers; otherwise runs as the
//! canonical instance, answering probes until SIGTERM/SIGINT.
//!
//! # Usage
//!
//! ```bash
//! # Local-only check with a fixed application identity
//! solo --identity 1aee6cb7-ef42-4d78-97ba-ac8ae744c4a5 --name my-app
//!
//! # Check the whole LAN, custom port and timeout
//! solo -i my-guid --lan --port 56253 --timeout-ms 2000
//!
//! # Same-host check via the named lock instead of UDP
//! solo -i my-guid --lock
//!
//! # Enable debug logging
//! RUST_LOG=solo_guard=debug solo -i my-guid
//! ```
//!
//! # Firewall
//!
//! Network-wide scope needs inbound/outbound UDP open on the discovery
//! port and on port + 1 (the probe send port).

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use solo_core::{
    config, InstanceId, NamedLock, ProbeConfig, Scope, Settings, DEFAULT_DISCOVERY_PORT,
    DEFAULT_RESPONSE_TIMEOUT,
};
use solo_guard::InstanceGuard;

/// solo - refuse to start when another instance is already running
#[derive(Parser, Debug)]
#[command(name = "solo", version, about)]
struct Args {
    /// Application identity (GUID); generated when omitted
    #[arg(short, long)]
    identity: Option<String>,

    /// Application display name, used only in log messages
    #[arg(short, long)]
    name: Option<String>,

    /// UDP discovery port (the probe send socket uses port + 1)
    #[arg(short, long)]
    port: Option<u16>,

    /// Response timeout in milliseconds
    #[arg(short = 't', long)]
    timeout_ms: Option<u64>,

    /// Check the entire LAN instead of only this host
    #[arg(long)]
    lan: bool,

    /// Settings file (TOML); CLI flags take precedence
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Use the same-host named lock instead of the UDP probe
    #[arg(long)]
    lock: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    run(args)
}

#[tokio::main]
async fn run(args: Args) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("solo=info".parse()?)
                .add_directive("solo_core=info".parse()?)
                .add_directive("solo_guard=info".parse()?),
        )
        .init();

    let settings = match &args.settings {
        Some(path) => Settings::load(path).context("Failed to load settings")?,
        None => Settings::default(),
    };

    let identity = args
        .identity
        .clone()
        .or_else(|| settings.identity.clone())
        .map(InstanceId::new)
        .unwrap_or_else(|| {
            let id = InstanceId::generate();
            warn!(
                identity = %id,
                "No identity configured, generated one; other instances only match \
                 when started with the same value"
            );
            id
        });

    let config = resolve_config(&args, &settings)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        app = config.display_name(),
        port = config.port(),
        "Checking for a running instance"
    );

    if args.lock {
        return run_with_lock(identity, config).await;
    }

    let mut guard = InstanceGuard::acquire(identity, config.clone())
        .await
        .context("Failed to acquire instance guard")?;

    if !guard.is_first_instance() {
        eprintln!("{} is already running.", config.display_name());
        process::exit(1);
    }

    info!(app = config.display_name(), "Started successfully");

    wait_for_shutdown_signal().await?;
    guard.shutdown().await;

    info!(app = config.display_name(), "Stopped");
    Ok(())
}

/// Resolves the effective configuration: CLI flags win over the settings
/// file, the settings file over `SOLO_PORT`, and that over the defaults.
fn resolve_config(args: &Args, settings: &Settings) -> Result<ProbeConfig> {
    let port = args
        .port
        .or(settings.port)
        .or_else(config::port_from_env)
        .unwrap_or(DEFAULT_DISCOVERY_PORT);

    let timeout = args
        .timeout_ms
        .or(settings.response_timeout_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_RESPONSE_TIMEOUT);

    let scope = if args.lan {
        Scope::NetworkWide
    } else {
        settings.scope.unwrap_or_default()
    };

    let mut probe_config = ProbeConfig::new(scope, port, timeout)?;
    if let Some(name) = args.name.clone().or_else(|| settings.app_name.clone()) {
        probe_config = probe_config.with_app_name(name);
    }
    Ok(probe_config)
}

/// Same-host-only variant: hold a named lock instead of probing.
async fn run_with_lock(identity: InstanceId, config: ProbeConfig) -> Result<()> {
    let mut lock = NamedLock::new(&identity);

    if !lock.try_acquire() {
        eprintln!("{} is already running.", config.display_name());
        process::exit(1);
    }

    info!(
        app = config.display_name(),
        "Started successfully (named lock held)"
    );

    wait_for_shutdown_signal().await?;
    lock.release();

    info!(app = config.display_name(), "Stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
