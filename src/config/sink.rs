//! Metrics sink configuration.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::validation::ConfigError;

/// Default Prometheus scrape port.
pub const DEFAULT_METRICS_PORT: u16 = 9110;

/// Default connect/request timeout for push sinks.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(5);

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_metrics_port() -> u16 {
    DEFAULT_METRICS_PORT
}

fn default_timeout() -> Duration {
    DEFAULT_SINK_TIMEOUT
}

/// The one sink results are forwarded to, selected by `type`.
///
/// ```yaml
/// sink:
///   type: carbon
///   host: graphite.internal
///   port: 2003
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    /// Log every result, send nothing.
    Log,

    /// Serve gauges for scraping.
    Prometheus {
        /// Listen address (default: "0.0.0.0").
        #[serde(default = "default_bind")]
        bind: String,

        /// Listen port (default: 9110).
        #[serde(default = "default_metrics_port")]
        port: u16,
    },

    /// Push plaintext lines to a Carbon receiver.
    Carbon {
        host: String,
        port: u16,

        /// Log lines instead of sending them.
        #[serde(default)]
        noop: bool,

        /// Connect and write timeout (default: 5s).
        #[serde(default = "default_timeout", with = "humantime_serde")]
        timeout: Duration,
    },

    /// Push line-protocol points to InfluxDB.
    Influxdb {
        /// Server base URL, e.g. `http://influxdb:8086`.
        url: String,
        database: String,

        /// Sent as `Authorization: Token <token>` when set.
        #[serde(default)]
        token: Option<String>,

        /// Request timeout (default: 5s).
        #[serde(default = "default_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::Prometheus {
            bind: default_bind(),
            port: DEFAULT_METRICS_PORT,
        }
    }
}

impl SinkConfig {
    /// Short sink name, matching the `type` value.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Prometheus { .. } => "prometheus",
            Self::Carbon { .. } => "carbon",
            Self::Influxdb { .. } => "influxdb",
        }
    }

    /// Validate sink-specific fields.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Log => Ok(()),
            Self::Prometheus { bind, port } => {
                bind.parse::<IpAddr>().map_err(|_| {
                    ConfigError::ValidationError(format!(
                        "invalid prometheus bind address: '{bind}'"
                    ))
                })?;
                if *port == 0 {
                    return Err(ConfigError::ValidationError(
                        "prometheus port must be non-zero".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Carbon { host, port, .. } => {
                if host.trim().is_empty() {
                    return Err(ConfigError::ValidationError(
                        "carbon host must not be empty".to_string(),
                    ));
                }
                if *port == 0 {
                    return Err(ConfigError::ValidationError(
                        "carbon port must be non-zero".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Influxdb { url, database, .. } => {
                let parsed = url::Url::parse(url).map_err(|e| {
                    ConfigError::ValidationError(format!("invalid influxdb url '{url}': {e}"))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::ValidationError(format!(
                        "influxdb url must be http or https: '{url}'"
                    )));
                }
                if database.trim().is_empty() {
                    return Err(ConfigError::ValidationError(
                        "influxdb database must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_config_default() {
        assert_eq!(
            SinkConfig::default(),
            SinkConfig::Prometheus {
                bind: "0.0.0.0".to_string(),
                port: 9110,
            }
        );
        assert!(SinkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_carbon() {
        let yaml = "type: carbon\nhost: graphite.internal\nport: 2003\nnoop: true\n";
        let config: SinkConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config,
            SinkConfig::Carbon {
                host: "graphite.internal".to_string(),
                port: 2003,
                noop: true,
                timeout: DEFAULT_SINK_TIMEOUT,
            }
        );
        assert_eq!(config.kind(), "carbon");
    }

    #[test]
    fn test_parse_influxdb() {
        let yaml = "type: influxdb\nurl: http://influx:8086\ndatabase: ping\ntoken: abc\ntimeout: 2s\n";
        let config: SinkConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config,
            SinkConfig::Influxdb {
                url: "http://influx:8086".to_string(),
                database: "ping".to_string(),
                token: Some("abc".to_string()),
                timeout: Duration::from_secs(2),
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_log_and_prometheus_defaults() {
        let config: SinkConfig = serde_yaml::from_str("type: log").unwrap();
        assert_eq!(config, SinkConfig::Log);

        let config: SinkConfig = serde_yaml::from_str("type: prometheus\nport: 9200").unwrap();
        assert_eq!(
            config,
            SinkConfig::Prometheus {
                bind: "0.0.0.0".to_string(),
                port: 9200,
            }
        );
    }

    #[test]
    fn test_parse_unknown_type() {
        assert!(serde_yaml::from_str::<SinkConfig>("type: statsd").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            SinkConfig::Prometheus {
                bind: "not-an-ip".to_string(),
                port: 9110,
            },
            SinkConfig::Prometheus {
                bind: "0.0.0.0".to_string(),
                port: 0,
            },
            SinkConfig::Carbon {
                host: " ".to_string(),
                port: 2003,
                noop: false,
                timeout: DEFAULT_SINK_TIMEOUT,
            },
            SinkConfig::Carbon {
                host: "graphite".to_string(),
                port: 0,
                noop: false,
                timeout: DEFAULT_SINK_TIMEOUT,
            },
            SinkConfig::Influxdb {
                url: "influx:8086".to_string(),
                database: "ping".to_string(),
                token: None,
                timeout: DEFAULT_SINK_TIMEOUT,
            },
            SinkConfig::Influxdb {
                url: "http://influx:8086".to_string(),
                database: "".to_string(),
                token: None,
                timeout: DEFAULT_SINK_TIMEOUT,
            },
        ];

        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::ValidationError(_)),
                "{config:?}: {err}"
            );
        }
    }
}
