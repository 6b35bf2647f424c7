//! Metrics Sinks
//!
//! Telemetry backends that receive [`ProbeResult`]s. Exactly one sink is
//! active per run and it is owned by the dispatcher task alone, so
//! implementations take `&mut self` and need no internal locking.
//!
//! - [`LogSink`]: structured log line per result
//! - [`PrometheusSink`]: gauges served from a pull endpoint
//! - [`CarbonSink`]: Graphite plaintext protocol over TCP
//! - [`InfluxSink`]: InfluxDB line protocol over HTTP

mod carbon;
mod influx;
mod log;
mod prometheus;

use thiserror::Error;

use crate::config::SinkConfig;
use crate::probe::ProbeResult;

pub use carbon::{CarbonSink, carbon_lines};
pub use influx::{InfluxSink, line_protocol};
pub use log::LogSink;
pub use prometheus::{
    AVG_MS_GAUGE, LOSS_PCT_GAUGE, MAX_MS_GAUGE, MDEV_MS_GAUGE, MIN_MS_GAUGE, PrometheusSink,
};

/// Errors returned by a sink's `send`.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Socket I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend rejected write with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Operation timed out.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Sink cannot work with its configuration.
    #[error("sink misconfigured: {0}")]
    Misconfigured(String),
}

/// A telemetry backend.
#[async_trait::async_trait]
pub trait MetricsSink: Send + 'static {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Forward one result to the backend.
    async fn send(&mut self, result: &ProbeResult) -> Result<(), SinkError>;
}

/// Build the configured push or log sink.
///
/// The Prometheus sink is built by the caller with [`PrometheusSink::new`]
/// because its render handle is also needed by the metrics server; passing
/// it here yields a fresh, unserved sink.
pub fn build_sink(config: &SinkConfig) -> Result<Box<dyn MetricsSink>, SinkError> {
    let sink: Box<dyn MetricsSink> = match config {
        SinkConfig::Log => Box::new(LogSink::new()),
        SinkConfig::Prometheus { .. } => Box::new(PrometheusSink::new()),
        SinkConfig::Carbon {
            host,
            port,
            noop,
            timeout,
        } => Box::new(CarbonSink::new(host.clone(), *port, *timeout).with_noop(*noop)),
        SinkConfig::Influxdb {
            url,
            database,
            token,
            timeout,
        } => Box::new(InfluxSink::new(url, database, token.clone(), *timeout)?),
    };

    tracing::info!(sink = sink.name(), "Metrics sink ready");
    Ok(sink)
}
