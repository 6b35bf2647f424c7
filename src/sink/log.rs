//! Log-only sink.

use crate::probe::ProbeResult;
use crate::sink::{MetricsSink, SinkError};

/// Writes every result as a structured log line.
///
/// Used when no backend is configured and as the fallback when the
/// configured backend turns out to be unusable.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl MetricsSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&mut self, result: &ProbeResult) -> Result<(), SinkError> {
        tracing::info!(
            origin = %result.origin,
            destination = %result.destination,
            hostname = %result.hostname,
            address_family = %result.address_family,
            timestamp = result.timestamp,
            succeeded = result.succeeded,
            loss_pct = result.stats.loss_pct,
            min_ms = result.stats.min_ms,
            avg_ms = result.stats.avg_ms,
            max_ms = result.stats.max_ms,
            mdev_ms = result.stats.mdev_ms,
            "Probe result"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{AddressFamily, ProbeStats};

    #[tokio::test]
    async fn test_log_sink_accepts_results() {
        let mut sink = LogSink::new();
        let result = ProbeResult {
            origin: "observer".to_string(),
            destination: "example.com".to_string(),
            hostname: "example.com".to_string(),
            address_family: AddressFamily::Ipv4,
            timestamp: 1_700_000_000,
            stats: ProbeStats::failed(100.0),
            succeeded: false,
        };

        assert!(sink.send(&result).await.is_ok());
        assert_eq!(sink.name(), "log");
    }
}
