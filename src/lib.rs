//! parallelping - Parallel Ping Prober
//!
//! Probes many destinations concurrently with the system `ping` binary and
//! forwards loss and round-trip statistics to one telemetry sink. It can be
//! used as a library, or run as the standalone `parallelping` binary.
//!
//! # Architecture
//!
//! - **Probe**: destination resolution, `ping` invocation and output parsing
//! - **Scheduler**: one task per destination, one-shot or on an interval
//! - **Dispatcher**: single consumer of the bounded results channel
//! - **Sink**: Prometheus, Carbon, InfluxDB or log-only backend
//! - **Server**: Prometheus scrape endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use parallelping::{
//!     CommandExecutor, LogSink, OutputParser, ProbeProfile, ProbeScheduler, ProfileKind,
//!     ResultDispatcher, Schedule, SchedulerSettings,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let profile = Arc::new(ProbeProfile::for_kind(ProfileKind::Iputils));
//!     let (tx, rx) = tokio::sync::mpsc::channel(64);
//!
//!     let dispatcher = ResultDispatcher::new(rx, Box::new(LogSink::new())).spawn();
//!     let mut scheduler = ProbeScheduler::new(
//!         SchedulerSettings { count: 5, schedule: Schedule::Once, dual_stack: false },
//!         CommandExecutor::new(Arc::clone(&profile)),
//!         OutputParser::new(profile, "observer"),
//!         tx,
//!     );
//!     scheduler.spawn_all(["example.com", "1.1.1.1"]);
//!
//!     scheduler.wait().await;
//!     dispatcher.await.unwrap();
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod probe;
pub mod scheduler;
pub mod server;
pub mod sink;

pub use config::{AppConfig, ConfigError, ProbeConfig, SinkConfig};
pub use dispatcher::{DispatchStats, ResultDispatcher};
pub use probe::{
    AddressFamily, CommandExecutor, OutputParser, ParseError, ProbeExecutor, ProbeOutput,
    ProbeProfile, ProbeResult, ProbeStats, ProfileKind, resolve_destinations, resolve_origin,
};
pub use scheduler::{CompletionReport, ProbeScheduler, Schedule, SchedulerSettings};
pub use sink::{
    CarbonSink, InfluxSink, LogSink, MetricsSink, PrometheusSink, SinkError, build_sink,
};
