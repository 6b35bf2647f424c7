//! Prometheus pull sink.
//!
//! Results update five gauges in a recorder owned by the sink. The recorder
//! is never installed as the global one: gauges are written only through
//! [`metrics::with_local_recorder`] from the dispatcher, while the metrics
//! server renders through a [`PrometheusHandle`].

use metrics::Label;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::probe::ProbeResult;
use crate::sink::{MetricsSink, SinkError};

pub const MIN_MS_GAUGE: &str = "ping_rtt_min_ms";
pub const AVG_MS_GAUGE: &str = "ping_rtt_avg_ms";
pub const MAX_MS_GAUGE: &str = "ping_rtt_max_ms";
pub const MDEV_MS_GAUGE: &str = "ping_rtt_mdev_ms";
pub const LOSS_PCT_GAUGE: &str = "ping_loss_pct";

/// Gauge-per-statistic sink exposed for scraping.
pub struct PrometheusSink {
    recorder: PrometheusRecorder,
}

impl std::fmt::Debug for PrometheusSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusSink").finish_non_exhaustive()
    }
}

impl Default for PrometheusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusSink {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();

        metrics::with_local_recorder(&recorder, || {
            metrics::describe_gauge!(MIN_MS_GAUGE, "Ping rtt minimum in ms.");
            metrics::describe_gauge!(AVG_MS_GAUGE, "Ping rtt average in ms.");
            metrics::describe_gauge!(MAX_MS_GAUGE, "Ping rtt maximum in ms.");
            metrics::describe_gauge!(MDEV_MS_GAUGE, "Ping rtt standard deviation in ms.");
            metrics::describe_gauge!(LOSS_PCT_GAUGE, "Ping rtt loss in percent.");
        });

        Self { recorder }
    }

    /// Read-only handle for rendering the exposition text.
    pub fn handle(&self) -> PrometheusHandle {
        self.recorder.handle()
    }
}

#[async_trait::async_trait]
impl MetricsSink for PrometheusSink {
    fn name(&self) -> &'static str {
        "prometheus"
    }

    async fn send(&mut self, result: &ProbeResult) -> Result<(), SinkError> {
        let labels = vec![
            Label::new("address_family", result.address_family.as_ref().to_string()),
            Label::new("destination", result.destination.clone()),
            Label::new("hostname", result.hostname.clone()),
        ];
        let stats = &result.stats;

        metrics::with_local_recorder(&self.recorder, || {
            metrics::gauge!(MIN_MS_GAUGE, labels.clone()).set(stats.min_ms);
            metrics::gauge!(AVG_MS_GAUGE, labels.clone()).set(stats.avg_ms);
            metrics::gauge!(MAX_MS_GAUGE, labels.clone()).set(stats.max_ms);
            metrics::gauge!(MDEV_MS_GAUGE, labels.clone()).set(stats.mdev_ms);
            metrics::gauge!(LOSS_PCT_GAUGE, labels).set(stats.loss_pct);
        });

        tracing::trace!(
            destination = %result.destination,
            address_family = %result.address_family,
            "Prometheus gauges updated"
        );
        Ok(())
    }
}
