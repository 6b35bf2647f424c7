//! Parsing of `ping` statistics output.
//!
//! All platform knowledge lives in the [`ProbeProfile`]; the parser only
//! applies its patterns. Every capture is looked up by name, so output that
//! does not follow the grammar yields a [`ParseError`], never a panic.

use std::sync::Arc;

use chrono::Utc;
use regex::Captures;
use thiserror::Error;

use crate::probe::{AddressFamily, ProbeOutput, ProbeProfile, ProbeResult, ProbeStats};

/// Output that does not match the profile's grammar.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// No `--- <host> ping statistics ---` footer.
    #[error("missing statistics footer")]
    MissingFooter,

    /// No packet loss line.
    #[error("missing packet loss line")]
    MissingLossLine,

    /// Probe succeeded but reported no round-trip statistics.
    #[error("missing round-trip statistics line")]
    MissingRttLine,

    /// A captured value is not a usable number.
    #[error("invalid {field} value '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    /// Round-trip times not ordered as min <= avg <= max.
    #[error("unordered round-trip times {min}/{avg}/{max}")]
    UnorderedRtt { min: f64, avg: f64, max: f64 },
}

/// Hostname and statistics extracted from one output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOutput {
    /// Destination as echoed in the footer.
    pub hostname: String,
    /// Parsed statistics.
    pub stats: ProbeStats,
}

/// Parse raw `ping` output with the given profile.
///
/// A failed probe (`succeeded == false`) only needs a footer and a loss
/// line; its round-trip fields are set to [`ProbeStats::FAILURE_SENTINEL`].
pub fn parse_output(
    raw: &str,
    succeeded: bool,
    profile: &ProbeProfile,
) -> Result<ParsedOutput, ParseError> {
    let hostname = profile
        .footer_pattern
        .captures(raw)
        .and_then(|caps| caps.name("hostname"))
        .map(|m| m.as_str().to_string())
        .ok_or(ParseError::MissingFooter)?;

    let loss_caps = profile
        .loss_pattern
        .captures(raw)
        .ok_or(ParseError::MissingLossLine)?;
    let loss_pct = required(&loss_caps, "loss", ParseError::MissingLossLine)?;
    if loss_pct > 100.0 {
        return Err(ParseError::InvalidNumber {
            field: "loss",
            value: loss_pct.to_string(),
        });
    }

    if !succeeded {
        return Ok(ParsedOutput {
            hostname,
            stats: ProbeStats::failed(loss_pct),
        });
    }

    let rtt_caps = profile
        .rtt_pattern
        .captures(raw)
        .ok_or(ParseError::MissingRttLine)?;

    let stats = ProbeStats {
        loss_pct,
        min_ms: required(&rtt_caps, "min", ParseError::MissingRttLine)?,
        avg_ms: required(&rtt_caps, "avg", ParseError::MissingRttLine)?,
        max_ms: required(&rtt_caps, "max", ParseError::MissingRttLine)?,
        mdev_ms: optional(&rtt_caps, "mdev")?.unwrap_or(ProbeStats::FAILURE_SENTINEL),
    };
    if !(stats.min_ms <= stats.avg_ms && stats.avg_ms <= stats.max_ms) {
        return Err(ParseError::UnorderedRtt {
            min: stats.min_ms,
            avg: stats.avg_ms,
            max: stats.max_ms,
        });
    }

    Ok(ParsedOutput { hostname, stats })
}

fn required(
    caps: &Captures<'_>,
    field: &'static str,
    missing: ParseError,
) -> Result<f64, ParseError> {
    optional(caps, field)?.ok_or(missing)
}

fn optional(caps: &Captures<'_>, field: &'static str) -> Result<Option<f64>, ParseError> {
    let Some(m) = caps.name(field) else {
        return Ok(None);
    };

    let invalid = || ParseError::InvalidNumber {
        field,
        value: m.as_str().to_string(),
    };
    let value: f64 = m.as_str().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok(Some(value))
}

/// Identity of the observing host.
///
/// A non-empty override wins; otherwise the local host name.
pub fn resolve_origin(origin_override: Option<&str>) -> String {
    match origin_override.map(str::trim) {
        Some(origin) if !origin.is_empty() => origin.to_string(),
        _ => gethostname::gethostname().to_string_lossy().into_owned(),
    }
}

/// Turns executor output into [`ProbeResult`]s.
///
/// Holds the process-wide profile and origin so tasks only pass what
/// varies per probe.
#[derive(Debug, Clone)]
pub struct OutputParser {
    profile: Arc<ProbeProfile>,
    origin: String,
}

impl OutputParser {
    /// Create a parser for the given profile and origin.
    pub fn new(profile: Arc<ProbeProfile>, origin: impl Into<String>) -> Self {
        Self {
            profile,
            origin: origin.into(),
        }
    }

    /// Parse one probe's output into a timestamped result.
    ///
    /// A probe that failed without printing anything (the tool could not be
    /// launched) yields a failed result at 100% loss instead of an error.
    pub fn parse(
        &self,
        destination: &str,
        family: AddressFamily,
        output: &ProbeOutput,
    ) -> Result<ProbeResult, ParseError> {
        let parsed = if !output.succeeded && output.raw.trim().is_empty() {
            ParsedOutput {
                hostname: destination.to_string(),
                stats: ProbeStats::failed(100.0),
            }
        } else {
            parse_output(&output.raw, output.succeeded, &self.profile)?
        };

        Ok(ProbeResult {
            origin: self.origin.clone(),
            destination: destination.to_string(),
            hostname: parsed.hostname,
            address_family: family,
            timestamp: Utc::now().timestamp(),
            stats: parsed.stats,
            succeeded: output.succeeded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProfileKind;

    const LINUX_OK: &str = "--- example.com ping statistics ---\n5 packets transmitted, 5 received, 0% packet loss\nrtt min/avg/max/mdev = 10.0/12.5/15.0/1.2 ms";

    const LINUX_FULL: &str = "\
PING one.one.one.one (1.1.1.1) 56(84) bytes of data.
64 bytes from one.one.one.one (1.1.1.1): icmp_seq=1 ttl=57 time=11.2 ms
64 bytes from one.one.one.one (1.1.1.1): icmp_seq=2 ttl=57 time=10.8 ms
64 bytes from one.one.one.one (1.1.1.1): icmp_seq=3 ttl=57 time=12.9 ms

--- one.one.one.one ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 10.812/11.633/12.901/0.912 ms
";

    const LINUX_TOTAL_LOSS: &str = "\
PING 10.255.255.1 (10.255.255.1) 56(84) bytes of data.

--- 10.255.255.1 ping statistics ---
5 packets transmitted, 0 received, 100% packet loss, time 4098ms
";

    const BUSYBOX_OK: &str = "\
PING example.org (93.184.215.14): 56 data bytes
64 bytes from 93.184.215.14: seq=0 ttl=56 time=89.342 ms
64 bytes from 93.184.215.14: seq=1 ttl=56 time=88.997 ms

--- example.org ping statistics ---
2 packets transmitted, 2 packets received, 0% packet loss
round-trip min/avg/max = 88.997/89.169/89.342 ms
";

    const OPENBSD_OK: &str = "\
PING openbsd.org (199.185.178.80): 56 data bytes
64 bytes from 199.185.178.80: icmp_seq=0 ttl=244 time=150.310 ms
64 bytes from 199.185.178.80: icmp_seq=1 ttl=244 time=149.880 ms

--- openbsd.org ping statistics ---
2 packets transmitted, 2 packets received, 0.0% packet loss
round-trip min/avg/max/std-dev = 149.880/150.095/150.310/0.215 ms
";

    fn profile(kind: ProfileKind) -> ProbeProfile {
        ProbeProfile::for_kind(kind)
    }

    #[test]
    fn test_parse_linux_fixture() {
        let parsed = parse_output(LINUX_OK, true, &profile(ProfileKind::Iputils)).unwrap();

        assert_eq!(parsed.hostname, "example.com");
        assert_eq!(
            parsed.stats,
            ProbeStats {
                loss_pct: 0.0,
                min_ms: 10.0,
                avg_ms: 12.5,
                max_ms: 15.0,
                mdev_ms: 1.2,
            }
        );
    }

    #[test]
    fn test_parse_linux_full_output() {
        let parsed = parse_output(LINUX_FULL, true, &profile(ProfileKind::Iputils)).unwrap();

        assert_eq!(parsed.hostname, "one.one.one.one");
        assert_eq!(parsed.stats.min_ms, 10.812);
        assert_eq!(parsed.stats.avg_ms, 11.633);
        assert_eq!(parsed.stats.max_ms, 12.901);
        assert_eq!(parsed.stats.mdev_ms, 0.912);
    }

    #[test]
    fn test_parse_round_trip_stddev_variant() {
        let raw = "--- host.example ping statistics ---\n4 packets transmitted, 3 received, 25% packet loss\nround-trip min/avg/max/stddev = 1.000/2.000/3.000/0.500 ms\n";
        let parsed = parse_output(raw, true, &profile(ProfileKind::Iputils)).unwrap();

        assert_eq!(parsed.stats.loss_pct, 25.0);
        assert_eq!(parsed.stats.mdev_ms, 0.5);
    }

    #[test]
    fn test_parse_failed_probe_uses_sentinel() {
        let parsed =
            parse_output(LINUX_TOTAL_LOSS, false, &profile(ProfileKind::Iputils)).unwrap();

        assert_eq!(parsed.hostname, "10.255.255.1");
        assert_eq!(parsed.stats, ProbeStats::failed(100.0));
    }

    #[test]
    fn test_parse_failed_probe_ignores_rtt_line() {
        // Exit status wins over whatever timing text is present
        let parsed = parse_output(LINUX_FULL, false, &profile(ProfileKind::Iputils)).unwrap();
        assert_eq!(parsed.stats, ProbeStats::failed(0.0));
    }

    #[test]
    fn test_parse_succeeded_without_rtt_line() {
        let result = parse_output(LINUX_TOTAL_LOSS, true, &profile(ProfileKind::Iputils));
        assert_eq!(result.unwrap_err(), ParseError::MissingRttLine);
    }

    #[test]
    fn test_parse_busybox_has_no_mdev() {
        let parsed = parse_output(BUSYBOX_OK, true, &profile(ProfileKind::Busybox)).unwrap();

        assert_eq!(parsed.hostname, "example.org");
        assert_eq!(parsed.stats.loss_pct, 0.0);
        assert_eq!(parsed.stats.min_ms, 88.997);
        assert_eq!(parsed.stats.avg_ms, 89.169);
        assert_eq!(parsed.stats.max_ms, 89.342);
        assert_eq!(parsed.stats.mdev_ms, ProbeStats::FAILURE_SENTINEL);
    }

    #[test]
    fn test_parse_openbsd_decimal_loss() {
        let parsed = parse_output(OPENBSD_OK, true, &profile(ProfileKind::OpenBsd)).unwrap();

        assert_eq!(parsed.hostname, "openbsd.org");
        assert_eq!(parsed.stats.loss_pct, 0.0);
        assert_eq!(parsed.stats.mdev_ms, 0.215);
    }

    #[test]
    fn test_parse_wrong_profile_misses_rtt() {
        // BusyBox grammar has no 4-tuple line
        let result = parse_output(LINUX_FULL, true, &profile(ProfileKind::Busybox));
        assert_eq!(result.unwrap_err(), ParseError::MissingRttLine);
    }

    #[test]
    fn test_parse_well_formed_invariants() {
        let fixtures = [
            (ProfileKind::Iputils, LINUX_OK),
            (ProfileKind::Iputils, LINUX_FULL),
            (ProfileKind::Busybox, BUSYBOX_OK),
            (ProfileKind::OpenBsd, OPENBSD_OK),
        ];

        for (kind, raw) in fixtures {
            let stats = parse_output(raw, true, &profile(kind)).unwrap().stats;
            assert!((0.0..=100.0).contains(&stats.loss_pct), "{kind}: loss");
            assert!(stats.min_ms <= stats.avg_ms, "{kind}: min <= avg");
            assert!(stats.avg_ms <= stats.max_ms, "{kind}: avg <= max");
        }
    }

    #[test]
    fn test_parse_missing_footer() {
        let usage = "Usage: ping [-aAbBdDfhLnOqrRUvV64] [-c count] destination\n";
        let result = parse_output(usage, false, &profile(ProfileKind::Iputils));
        assert_eq!(result.unwrap_err(), ParseError::MissingFooter);

        assert_eq!(
            parse_output("", false, &profile(ProfileKind::Iputils)).unwrap_err(),
            ParseError::MissingFooter
        );
    }

    #[test]
    fn test_parse_missing_loss_line() {
        let raw = "--- example.com ping statistics ---\n";
        let result = parse_output(raw, true, &profile(ProfileKind::Iputils));
        assert_eq!(result.unwrap_err(), ParseError::MissingLossLine);
    }

    #[test]
    fn test_parse_loss_above_hundred() {
        let raw = "--- example.com ping statistics ---\n1 packets transmitted, 0 received, 250% packet loss\n";
        let result = parse_output(raw, false, &profile(ProfileKind::Iputils));
        assert!(matches!(
            result.unwrap_err(),
            ParseError::InvalidNumber { field: "loss", .. }
        ));
    }

    #[test]
    fn test_parse_unordered_rtt() {
        let raw = "--- example.com ping statistics ---\n5 packets transmitted, 5 received, 0% packet loss\nrtt min/avg/max/mdev = 15.0/12.5/10.0/1.2 ms";
        let result = parse_output(raw, true, &profile(ProfileKind::Iputils));
        assert_eq!(
            result.unwrap_err(),
            ParseError::UnorderedRtt {
                min: 15.0,
                avg: 12.5,
                max: 10.0,
            }
        );

        // Equal values are ordered
        let raw = "--- example.com ping statistics ---\n1 packets transmitted, 1 received, 0% packet loss\nrtt min/avg/max/mdev = 7.0/7.0/7.0/0.0 ms";
        let stats = parse_output(raw, true, &profile(ProfileKind::Iputils))
            .unwrap()
            .stats;
        assert_eq!(stats.avg_ms, 7.0);
    }

    #[test]
    fn test_parse_never_panics_on_garbage() {
        let full = LINUX_FULL;
        let garbage = [
            "\0\0\0",
            "--- ",
            "--- ping statistics ---",
            "% packet loss",
            "rtt min/avg/max/mdev = ///",
            "rtt min/avg/max/mdev = 1.0/2.0/3.0/ ms",
            "--- x ping statistics ---\n% packet loss\nrtt min/avg/max/mdev = a.b/c.d/e.f/g.h ms",
            "ü--- ümlaut ping statistics ---\n12% packet loss",
        ];

        for kind in [ProfileKind::Iputils, ProfileKind::Busybox, ProfileKind::OpenBsd] {
            let profile = profile(kind);
            for raw in garbage {
                let _ = parse_output(raw, true, &profile);
                let _ = parse_output(raw, false, &profile);
            }
            // Every prefix of a real output
            for end in (0..=full.len()).filter(|i| full.is_char_boundary(*i)) {
                let _ = parse_output(&full[..end], true, &profile);
                let _ = parse_output(&full[..end], false, &profile);
            }
        }
    }

    #[test]
    fn test_output_parser_builds_result() {
        let parser = OutputParser::new(Arc::new(profile(ProfileKind::Iputils)), "observer-1");
        let output = ProbeOutput {
            raw: LINUX_OK.to_string(),
            succeeded: true,
        };

        let before = Utc::now().timestamp();
        let result = parser
            .parse("example.com", AddressFamily::Ipv6, &output)
            .unwrap();

        assert_eq!(result.origin, "observer-1");
        assert_eq!(result.destination, "example.com");
        assert_eq!(result.hostname, "example.com");
        assert_eq!(result.address_family, AddressFamily::Ipv6);
        assert!(result.succeeded);
        assert!(result.timestamp >= before);
        assert_eq!(result.stats.avg_ms, 12.5);
    }

    #[test]
    fn test_output_parser_failed_probe() {
        let parser = OutputParser::new(Arc::new(profile(ProfileKind::Iputils)), "observer-1");
        let output = ProbeOutput {
            raw: "--- example.com ping statistics ---\n5 packets transmitted, 0 received, 100% packet loss\n".to_string(),
            succeeded: false,
        };

        let result = parser
            .parse("example.com", AddressFamily::Ipv4, &output)
            .unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.stats, ProbeStats::failed(100.0));
    }

    #[test]
    fn test_output_parser_launch_failure() {
        let parser = OutputParser::new(Arc::new(profile(ProfileKind::Iputils)), "observer-1");
        let result = parser
            .parse("example.com", AddressFamily::Ipv4, &ProbeOutput::launch_failed())
            .unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.hostname, "example.com");
        assert_eq!(result.stats, ProbeStats::failed(100.0));

        // Output that is present but unreadable is still an error
        let output = ProbeOutput {
            raw: "ping: unknown host example.invalid".to_string(),
            succeeded: false,
        };
        assert_eq!(
            parser
                .parse("example.invalid", AddressFamily::Ipv4, &output)
                .unwrap_err(),
            ParseError::MissingFooter
        );
    }

    #[test]
    fn test_resolve_origin() {
        assert_eq!(resolve_origin(Some("probe-eu-1")), "probe-eu-1");
        assert_eq!(resolve_origin(Some("  probe-eu-1 ")), "probe-eu-1");

        let local = resolve_origin(None);
        assert_eq!(resolve_origin(Some("")), local);
    }
}
