//! Core data types produced by a probe cycle.
//!
//! - [`AddressFamily`]: which IP family a sub-probe ran over
//! - [`ProbeStats`]: loss and round-trip statistics parsed from tool output
//! - [`ProbeResult`]: one observation, moved through the result channel

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// IP address family of a probe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AddressFamily {
    /// IPv4, the primary family of every cycle.
    Ipv4,
    /// IPv6, probed only when dual-stack is enabled.
    Ipv6,
}

impl AddressFamily {
    /// Families probed in one cycle, in probe order.
    pub fn cycle(dual_stack: bool) -> &'static [AddressFamily] {
        if dual_stack {
            &[Self::Ipv4, Self::Ipv6]
        } else {
            &[Self::Ipv4]
        }
    }
}

/// Packet loss and round-trip statistics of one probe.
///
/// When the probe failed, or the platform does not report a field, the
/// round-trip fields hold [`ProbeStats::FAILURE_SENTINEL`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeStats {
    /// Packet loss in percent, `0..=100`.
    pub loss_pct: f64,
    /// Minimum round-trip time in milliseconds.
    pub min_ms: f64,
    /// Average round-trip time in milliseconds.
    pub avg_ms: f64,
    /// Maximum round-trip time in milliseconds.
    pub max_ms: f64,
    /// Mean deviation (or stddev) of round-trip times in milliseconds.
    pub mdev_ms: f64,
}

impl ProbeStats {
    /// Value of round-trip fields that were not measured.
    pub const FAILURE_SENTINEL: f64 = 0.0;

    /// Stats for a failed probe: reported loss, no timing.
    pub fn failed(loss_pct: f64) -> Self {
        Self {
            loss_pct,
            min_ms: Self::FAILURE_SENTINEL,
            avg_ms: Self::FAILURE_SENTINEL,
            max_ms: Self::FAILURE_SENTINEL,
            mdev_ms: Self::FAILURE_SENTINEL,
        }
    }

    /// Stats as `(name, value)` pairs in sink emission order.
    pub fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("loss", self.loss_pct),
            ("min", self.min_ms),
            ("avg", self.avg_ms),
            ("max", self.max_ms),
            ("mdev", self.mdev_ms),
        ]
    }
}

/// One probe observation for a (destination, address family, cycle) tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Identity of the observing host.
    pub origin: String,
    /// Destination as given in the configuration.
    pub destination: String,
    /// Destination as echoed by the probe tool's statistics footer.
    pub hostname: String,
    /// Address family of this sub-probe.
    pub address_family: AddressFamily,
    /// Unix timestamp (seconds) taken when the output was parsed.
    pub timestamp: i64,
    /// Parsed statistics.
    pub stats: ProbeStats,
    /// Whether the probe tool exited successfully.
    pub succeeded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_address_family_strings() {
        assert_eq!(AddressFamily::Ipv4.as_ref(), "ipv4");
        assert_eq!(AddressFamily::Ipv6.to_string(), "ipv6");
        assert_eq!(AddressFamily::from_str("IPv6").unwrap(), AddressFamily::Ipv6);
        assert!(AddressFamily::from_str("ipx").is_err());
    }

    #[test]
    fn test_cycle_families() {
        assert_eq!(AddressFamily::cycle(false), &[AddressFamily::Ipv4]);
        assert_eq!(
            AddressFamily::cycle(true),
            &[AddressFamily::Ipv4, AddressFamily::Ipv6]
        );
    }

    #[test]
    fn test_failed_stats_use_sentinel() {
        let stats = ProbeStats::failed(100.0);
        assert_eq!(stats.loss_pct, 100.0);
        assert_eq!(stats.min_ms, ProbeStats::FAILURE_SENTINEL);
        assert_eq!(stats.avg_ms, ProbeStats::FAILURE_SENTINEL);
        assert_eq!(stats.max_ms, ProbeStats::FAILURE_SENTINEL);
        assert_eq!(stats.mdev_ms, ProbeStats::FAILURE_SENTINEL);
    }

    #[test]
    fn test_fields_order() {
        let names: Vec<_> = ProbeStats::failed(0.0)
            .fields()
            .iter()
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(names, ["loss", "min", "avg", "max", "mdev"]);
    }
}
