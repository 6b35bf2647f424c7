//! Result dispatcher.
//!
//! Single-consumer pattern: one task owns the sink and drains the results
//! channel that every probe task feeds.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::probe::ProbeResult;
use crate::sink::{LogSink, MetricsSink, SinkError};

/// Counters reported when the dispatcher stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Results taken off the channel.
    pub received: u64,
    /// Results the sink accepted.
    pub sent: u64,
    /// Results the sink failed to accept.
    pub failed: u64,
}

/// Forwards every result to the one active sink.
pub struct ResultDispatcher {
    rx: mpsc::Receiver<ProbeResult>,
    sink: Box<dyn MetricsSink>,
    stats: DispatchStats,
}

impl std::fmt::Debug for ResultDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultDispatcher")
            .field("sink", &self.sink.name())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl ResultDispatcher {
    pub fn new(rx: mpsc::Receiver<ProbeResult>, sink: Box<dyn MetricsSink>) -> Self {
        Self {
            rx,
            sink,
            stats: DispatchStats::default(),
        }
    }

    /// Run on a dedicated task.
    pub fn spawn(self) -> JoinHandle<DispatchStats> {
        tokio::spawn(self.run())
    }

    /// Drain the channel until every sender is dropped.
    ///
    /// A failed send is logged and counted; later results are still sent.
    pub async fn run(mut self) -> DispatchStats {
        tracing::info!(sink = self.sink.name(), "Result dispatcher started");

        while let Some(result) = self.rx.recv().await {
            self.stats.received += 1;
            self.dispatch(&result).await;
        }

        tracing::info!(
            sink = self.sink.name(),
            received = self.stats.received,
            sent = self.stats.sent,
            failed = self.stats.failed,
            "Result dispatcher stopped"
        );
        self.stats
    }

    async fn dispatch(&mut self, result: &ProbeResult) {
        match self.sink.send(result).await {
            Ok(()) => self.stats.sent += 1,
            Err(SinkError::Misconfigured(reason)) => {
                self.stats.failed += 1;
                tracing::error!(
                    sink = self.sink.name(),
                    reason = %reason,
                    "Sink is misconfigured, falling back to log-only"
                );
                self.sink = Box::new(LogSink::new());
            }
            Err(e) => {
                self.stats.failed += 1;
                tracing::warn!(
                    sink = self.sink.name(),
                    destination = %result.destination,
                    address_family = %result.address_family,
                    error = %e,
                    "Failed to send probe result"
                );
            }
        }
    }
}
