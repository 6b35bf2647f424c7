//! Configuration module for parallelping.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Probe settings (destinations, count, interval, dual-stack, origin)
//! - Probe profile selection (ping implementation, binary override)
//! - Metrics sink selection (Prometheus, Carbon, InfluxDB, log)

mod app;
mod sink;
mod validation;

pub use app::{AppConfig, ProbeConfig};
pub use sink::SinkConfig;
pub use validation::{ConfigError, expand_env_vars, parse_duration};

// Re-export constants
pub use app::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_INTERVAL, DEFAULT_PING_COUNT, MAX_CHANNEL_CAPACITY,
};
pub use sink::{DEFAULT_METRICS_PORT, DEFAULT_SINK_TIMEOUT};
