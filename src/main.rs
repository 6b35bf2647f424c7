//! parallelping Binary Entry Point
//!
//! Wires configuration, the probe scheduler, the result dispatcher and the
//! selected sink. Core functionality is provided by the `parallelping`
//! library crate.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use parallelping::{
    config::{AppConfig, DEFAULT_SINK_TIMEOUT, SinkConfig, parse_duration},
    dispatcher::ResultDispatcher,
    probe::{CommandExecutor, OutputParser, ProfileKind, resolve_destinations, resolve_origin},
    scheduler::{DEFAULT_SHUTDOWN_TIMEOUT, ProbeScheduler},
    server,
    sink::{MetricsSink, PrometheusSink, build_sink},
};
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// parallelping - Parallel Ping Prober
#[derive(Parser, Debug)]
#[command(name = "parallelping", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "PARALLELPING_CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated list of destinations to ping (overrides config file)
    #[arg(long, env = "PARALLELPING_DESTINATION", value_delimiter = ',')]
    destination: Vec<String>,

    /// Number of pings per cycle
    #[arg(long, env = "PARALLELPING_PINGCOUNT")]
    pingcount: Option<u32>,

    /// Wait between each round of pings, e.g. 60s
    #[arg(long, env = "PARALLELPING_INTERVAL", value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Execute just one ping round per destination, do not loop
    #[arg(long)]
    oneshot: bool,

    /// Also ping via IPv6 and gather statistics
    #[arg(long)]
    ipv6: bool,

    /// Override hostname as origin with this value
    #[arg(long, env = "PARALLELPING_ORIGIN")]
    origin: Option<String>,

    /// Ping implementation (iputils, busybox, openbsd); detected when unset
    #[arg(long, env = "PARALLELPING_PROFILE")]
    profile: Option<ProfileKind>,

    /// Path of the ping binary
    #[arg(long, env = "PARALLELPING_PING_BINARY")]
    ping_binary: Option<PathBuf>,

    /// Port to listen on for Prometheus scrapes
    #[arg(long, env = "PARALLELPING_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Carbon receiver host; switches the sink to Carbon
    #[arg(long, env = "PARALLELPING_CARBON_HOST")]
    carbon_host: Option<String>,

    /// Carbon receiver port
    #[arg(long, env = "PARALLELPING_CARBON_PORT")]
    carbon_port: Option<u16>,

    /// Log Carbon lines instead of sending them
    #[arg(long)]
    carbon_noop: bool,

    /// Only log results, do not export them
    #[arg(long)]
    log_only: bool,

    /// Log every result and each probe invocation
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Apply CLI/env overrides (CLI > ENV > config file).
    fn apply_overrides(&self, config: &mut AppConfig) {
        if !self.destination.is_empty() {
            config.destinations = self.destination.clone();
        }
        if let Some(count) = self.pingcount {
            config.ping_count = count;
        }
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if self.oneshot {
            config.oneshot = true;
        }
        if self.ipv6 {
            config.ipv6 = true;
        }
        if let Some(origin) = &self.origin {
            config.origin = Some(origin.clone());
        }
        if let Some(profile) = self.profile {
            config.probe.profile = Some(profile);
        }
        if let Some(binary) = &self.ping_binary {
            config.probe.binary = Some(binary.clone());
        }

        if let Some(host) = &self.carbon_host {
            let (port, noop, timeout) = match &config.sink {
                SinkConfig::Carbon {
                    port,
                    noop,
                    timeout,
                    ..
                } => (*port, *noop, *timeout),
                _ => (0, false, DEFAULT_SINK_TIMEOUT),
            };
            config.sink = SinkConfig::Carbon {
                host: host.clone(),
                port,
                noop,
                timeout,
            };
        }
        if let SinkConfig::Carbon { port, noop, .. } = &mut config.sink {
            if let Some(carbon_port) = self.carbon_port {
                *port = carbon_port;
            }
            if self.carbon_noop {
                *noop = true;
            }
        }

        if let Some(metrics_port) = self.metrics_port {
            match &mut config.sink {
                SinkConfig::Prometheus { port, .. } => *port = metrics_port,
                other => tracing::warn!(
                    sink = other.kind(),
                    "--metrics-port ignored, sink is not prometheus"
                ),
            }
        }

        if self.log_only {
            config.sink = SinkConfig::Log;
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    fn default_filter(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug,parallelping=trace"
        } else {
            "info"
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.default_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "parallelping starting");

    // Load configuration; the file is optional when flags carry everything
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration");
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    let profile = Arc::new(config.probe.build_profile());
    let origin = resolve_origin(config.origin.as_deref());
    tracing::info!(
        profile = %profile.kind,
        binary = %profile.binary.display(),
        origin = %origin,
        "Probe profile ready"
    );

    let destinations = resolve_destinations(&config.destinations).await;
    if destinations.is_empty() {
        return Err("none of the configured destinations could be resolved".into());
    }

    let (results_tx, results_rx) = mpsc::channel(config.channel_capacity);

    // Build the sink; the Prometheus sink also gets its scrape server
    let (server_stop_tx, server_stop_rx) = oneshot::channel::<()>();
    let mut metrics_server = None;
    let sink: Box<dyn MetricsSink> = match &config.sink {
        SinkConfig::Prometheus { bind, port } => {
            let sink = PrometheusSink::new();
            let addr = SocketAddr::new(bind.parse()?, *port);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            let shutdown = async move {
                let _ = server_stop_rx.await;
            };
            metrics_server = Some(tokio::spawn(server::serve(
                listener,
                sink.handle(),
                shutdown,
            )));
            Box::new(sink)
        }
        other => build_sink(other)?,
    };

    let dispatcher = ResultDispatcher::new(results_rx, sink).spawn();

    let mut scheduler = ProbeScheduler::new(
        config.scheduler_settings(),
        CommandExecutor::new(Arc::clone(&profile)),
        OutputParser::new(profile, origin),
        results_tx,
    );
    scheduler.spawn_all(destinations);

    let report = if config.oneshot {
        scheduler.wait().await
    } else {
        tracing::info!("Press Ctrl+C to shutdown");
        shutdown_signal().await;
        scheduler.shutdown(DEFAULT_SHUTDOWN_TIMEOUT).await
    };

    // Every sender is gone once the scheduler is consumed
    let stats = dispatcher.await?;
    tracing::info!(
        tasks = report.tasks,
        emitted = report.emitted,
        failed_cycles = report.failed_cycles,
        sent = stats.sent,
        failed = stats.failed,
        "Probing finished"
    );

    if let Some(metrics_server) = metrics_server {
        let _ = server_stop_tx.send(());
        metrics_server.await??;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
