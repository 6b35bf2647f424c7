//! InfluxDB line-protocol sink.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use url::Url;

use crate::probe::ProbeResult;
use crate::sink::{MetricsSink, SinkError};

/// Measurement every point is written to.
const MEASUREMENT: &str = "ping";

/// Escape a tag value for line protocol.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One line-protocol point for a result, second precision.
///
/// `ping,origin=<o>,destination=<d> loss=..,min=..,avg=..,max=..,mdev=.. <ts>`
pub fn line_protocol(result: &ProbeResult) -> String {
    let fields = result
        .stats
        .fields()
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{MEASUREMENT},origin={},destination={} {fields} {}",
        escape_tag(&result.origin),
        escape_tag(&result.destination),
        result.timestamp
    )
}

/// Writes points to an InfluxDB `/write` endpoint.
#[derive(Debug, Clone)]
pub struct InfluxSink {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl InfluxSink {
    /// Create a sink writing to `database` on the server at `url`.
    ///
    /// # Errors
    /// Returns `SinkError::Misconfigured` if the URL cannot be used or the
    /// HTTP client cannot be built.
    pub fn new(
        url: &str,
        database: &str,
        token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, SinkError> {
        let mut endpoint = Url::parse(url)
            .map_err(|e| SinkError::Misconfigured(format!("invalid influxdb url '{url}': {e}")))?;
        endpoint
            .path_segments_mut()
            .map_err(|()| SinkError::Misconfigured(format!("influxdb url '{url}' cannot be a base")))?
            .pop_if_empty()
            .push("write");
        endpoint
            .query_pairs_mut()
            .append_pair("db", database)
            .append_pair("precision", "s");

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SinkError::Misconfigured(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    /// Full write URL including query parameters.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl MetricsSink for InfluxSink {
    fn name(&self) -> &'static str {
        "influxdb"
    }

    async fn send(&mut self, result: &ProbeResult) -> Result<(), SinkError> {
        let point = line_protocol(result);

        let mut request = self.client.post(self.endpoint.clone()).body(point);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Token {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(destination = %result.destination, "InfluxDB point written");
        Ok(())
    }
}
