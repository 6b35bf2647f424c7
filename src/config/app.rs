//! Application configuration structures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::{ProbeProfile, ProfileKind};
use crate::scheduler::{Schedule, SchedulerSettings};

use super::sink::SinkConfig;
use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default number of echo requests per probe.
pub const DEFAULT_PING_COUNT: u32 = 5;

/// Default pause between cycles (60 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default capacity of the results channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Largest accepted results channel capacity.
pub const MAX_CHANNEL_CAPACITY: usize = 1 << 20;

// =============================================================================
// Probe Configuration
// =============================================================================

/// Which `ping` implementation to drive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Output profile; detected from the host when omitted.
    pub profile: Option<ProfileKind>,

    /// Override of the profile's binary path.
    pub binary: Option<PathBuf>,
}

impl ProbeConfig {
    /// Build the profile shared by the executor and the parser.
    pub fn build_profile(&self) -> ProbeProfile {
        let kind = self.profile.unwrap_or_else(ProfileKind::detect);
        let profile = ProbeProfile::for_kind(kind);

        match &self.binary {
            Some(binary) => profile.with_binary(binary),
            None => profile,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
///
/// Every field has a default so a run can be configured from flags alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Hosts or IP literals to probe.
    pub destinations: Vec<String>,

    /// Echo requests per probe (default: 5).
    pub ping_count: u32,

    /// Pause between cycles (default: 60s, minimum: 1s).
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Run one cycle per destination and exit.
    pub oneshot: bool,

    /// Probe IPv6 as well as IPv4.
    pub ipv6: bool,

    /// Origin label; the host name when unset.
    pub origin: Option<String>,

    /// Results channel capacity (default: 64).
    pub channel_capacity: usize,

    pub probe: ProbeConfig,

    pub sink: SinkConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            destinations: Vec::new(),
            ping_count: DEFAULT_PING_COUNT,
            interval: DEFAULT_INTERVAL,
            oneshot: false,
            ipv6: false,
            origin: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            probe: ProbeConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded before parsing.
    /// The result is not validated, so command-line overrides can still be
    /// applied; call [`AppConfig::validate`] afterwards.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    /// Returns `ConfigError::ParseError` if the text is not a valid config.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        Ok(serde_yaml::from_str(&expanded)?)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.destinations.iter().all(|d| d.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "at least one destination is required".to_string(),
            ));
        }

        if self.ping_count == 0 {
            return Err(ConfigError::ValidationError(
                "ping_count must be positive".to_string(),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel_capacity must be positive".to_string(),
            ));
        }
        if self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(ConfigError::ValidationError(format!(
                "channel_capacity must be at most {MAX_CHANNEL_CAPACITY}"
            )));
        }

        if let Some(origin) = &self.origin
            && origin.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "origin must not be blank when set".to_string(),
            ));
        }

        self.sink.validate()
    }

    /// Scheduler settings derived from this configuration.
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        let schedule = if self.oneshot {
            Schedule::Once
        } else {
            Schedule::interval(self.interval)
        };

        SchedulerSettings {
            count: self.ping_count,
            schedule,
            dual_stack: self.ipv6,
        }
    }
}
