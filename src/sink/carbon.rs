//! Carbon plaintext sink.
//!
//! Sends one `<path> <value> <timestamp>` line per statistic to a Carbon
//! line receiver.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::probe::ProbeResult;
use crate::sink::{MetricsSink, SinkError};

/// Root of every metric path.
const PATH_PREFIX: &str = "ping";

/// Plaintext lines for one result, newline-terminated.
///
/// Path pattern: `ping.<origin>.<destination with dots as underscores>.<stat>`.
pub fn carbon_lines(result: &ProbeResult) -> String {
    let destination = result.destination.replace('.', "_");
    let prefix = format!("{PATH_PREFIX}.{}.{destination}", result.origin);

    result
        .stats
        .fields()
        .iter()
        .map(|(stat, value)| format!("{prefix}.{stat} {value} {}\n", result.timestamp))
        .collect()
}

/// Carbon line-receiver sink with a lazily opened connection.
pub struct CarbonSink {
    host: String,
    port: u16,
    io_timeout: Duration,
    noop: bool,
    stream: Option<TcpStream>,
}

impl std::fmt::Debug for CarbonSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarbonSink")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("noop", &self.noop)
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

impl CarbonSink {
    /// Create a sink for `host:port`; nothing is connected until the first send.
    pub fn new(host: impl Into<String>, port: u16, io_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            io_timeout,
            noop: false,
            stream: None,
        }
    }

    /// Log lines instead of sending them.
    pub fn with_noop(mut self, noop: bool) -> Self {
        self.noop = noop;
        self
    }

    async fn connect(&self) -> Result<TcpStream, SinkError> {
        let addr = format!("{}:{}", self.host, self.port);
        let stream = timeout(self.io_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| SinkError::Timeout(self.io_timeout))??;
        tracing::debug!(addr = %addr, "Connected to carbon receiver");
        Ok(stream)
    }

    async fn write_lines(&mut self, lines: &str) -> Result<(), SinkError> {
        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.connect().await?,
        };

        let written = timeout(self.io_timeout, async {
            stream.write_all(lines.as_bytes()).await?;
            stream.flush().await?;
            Ok::<_, std::io::Error>(())
        })
        .await;

        // A failed connection is dropped so the next send reconnects
        match written {
            Ok(Ok(())) => {
                self.stream = Some(stream);
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(SinkError::Timeout(self.io_timeout)),
        }
    }
}

#[async_trait::async_trait]
impl MetricsSink for CarbonSink {
    fn name(&self) -> &'static str {
        "carbon"
    }

    async fn send(&mut self, result: &ProbeResult) -> Result<(), SinkError> {
        let lines = carbon_lines(result);

        if self.noop {
            tracing::info!(lines = %lines.trim_end(), "Carbon noop, not sending");
            return Ok(());
        }

        self.write_lines(&lines).await?;
        tracing::debug!(destination = %result.destination, "Carbon metrics sent");
        Ok(())
    }
}
