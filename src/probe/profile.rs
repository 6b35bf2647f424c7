//! Platform probe profiles.
//!
//! A [`ProbeProfile`] bundles everything platform-specific about the
//! external `ping` binary: where it lives, how to select an address family,
//! and the patterns that pick its statistics apart. It is chosen once at
//! startup and shared read-only by every probe task.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::probe::AddressFamily;

/// Footer echoed by every supported `ping`: `--- host ping statistics ---`.
const FOOTER_PATTERN: &str = r"--- (?P<hostname>\S+) ping statistics ---";

const IPUTILS_LOSS_PATTERN: &str = r"(?P<loss>\d+(?:\.\d+)?)% packet loss";
const IPUTILS_RTT_PATTERN: &str = r"(?:rtt|round-trip) min/avg/max/(?:mdev|stddev) = (?P<min>\d+\.\d+)/(?P<avg>\d+\.\d+)/(?P<max>\d+\.\d+)/(?P<mdev>\d+\.\d+) ms";

const BUSYBOX_LOSS_PATTERN: &str = r"(?P<loss>\d+)% packet loss";
const BUSYBOX_RTT_PATTERN: &str =
    r"round-trip min/avg/max = (?P<min>\d+\.\d+)/(?P<avg>\d+\.\d+)/(?P<max>\d+\.\d+) ms";

const OPENBSD_LOSS_PATTERN: &str = r"(?P<loss>\d+\.\d+)% packet loss";
const OPENBSD_RTT_PATTERN: &str = r"round-trip min/avg/max/std-dev = (?P<min>\d+\.\d+)/(?P<avg>\d+\.\d+)/(?P<max>\d+\.\d+)/(?P<mdev>\d+\.\d+) ms";

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Known `ping` implementations.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProfileKind {
    /// Linux iputils (Debian, Ubuntu and most glibc distributions).
    Iputils,
    /// BusyBox applet (Alpine).
    Busybox,
    /// OpenBSD base system.
    OpenBsd,
}

impl ProfileKind {
    /// Detect the profile of the running host.
    ///
    /// Reads `/etc/os-release` on Linux. Anything unrecognized falls back to
    /// iputils.
    pub fn detect() -> Self {
        if cfg!(target_os = "openbsd") {
            tracing::info!(profile = %Self::OpenBsd, "Probe profile detected from target OS");
            return Self::OpenBsd;
        }

        match std::fs::read_to_string(OS_RELEASE_PATH) {
            Ok(contents) => {
                tracing::debug!(path = OS_RELEASE_PATH, %contents, "Read os-release");
                let kind = Self::from_os_release(&contents);
                tracing::info!(profile = %kind, "Probe profile detected from os-release");
                kind
            }
            Err(e) => {
                tracing::warn!(
                    path = OS_RELEASE_PATH,
                    error = %e,
                    "Cannot read os-release, assuming iputils"
                );
                Self::Iputils
            }
        }
    }

    /// Map the contents of an `os-release` file to a profile.
    pub fn from_os_release(contents: &str) -> Self {
        static ID_REGEX: OnceLock<Regex> = OnceLock::new();

        let regex = ID_REGEX.get_or_init(|| {
            Regex::new(r#"(?m)^ID="?(?P<id>[A-Za-z0-9._-]+)"?\s*$"#)
                .expect("failed to compile os-release regex")
        });

        match regex.captures(contents).and_then(|caps| caps.name("id")) {
            Some(id) if id.as_str().eq_ignore_ascii_case("alpine") => Self::Busybox,
            _ => Self::Iputils,
        }
    }
}

/// Immutable description of the platform's `ping` binary and output grammar.
#[derive(Debug, Clone)]
pub struct ProbeProfile {
    /// Implementation this profile describes.
    pub kind: ProfileKind,
    /// Path of the `ping` binary.
    pub binary: PathBuf,
    /// Argument selecting IPv4.
    pub ipv4_flag: String,
    /// Argument selecting IPv6.
    pub ipv6_flag: String,
    /// Captures `loss`.
    pub loss_pattern: Regex,
    /// Captures `min`, `avg`, `max` and optionally `mdev`.
    pub rtt_pattern: Regex,
    /// Captures `hostname`.
    pub footer_pattern: Regex,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in probe pattern must compile")
}

impl ProbeProfile {
    /// Built-in profile for a `ping` implementation.
    pub fn for_kind(kind: ProfileKind) -> Self {
        let (binary, loss, rtt) = match kind {
            ProfileKind::Iputils => ("/usr/bin/ping", IPUTILS_LOSS_PATTERN, IPUTILS_RTT_PATTERN),
            ProfileKind::Busybox => ("/bin/ping", BUSYBOX_LOSS_PATTERN, BUSYBOX_RTT_PATTERN),
            ProfileKind::OpenBsd => ("/sbin/ping", OPENBSD_LOSS_PATTERN, OPENBSD_RTT_PATTERN),
        };

        Self {
            kind,
            binary: PathBuf::from(binary),
            ipv4_flag: "-4".to_string(),
            ipv6_flag: "-6".to_string(),
            loss_pattern: compile(loss),
            rtt_pattern: compile(rtt),
            footer_pattern: compile(FOOTER_PATTERN),
        }
    }

    /// Override the binary path.
    pub fn with_binary(mut self, binary: impl AsRef<Path>) -> Self {
        self.binary = binary.as_ref().to_path_buf();
        self
    }

    /// Argument selecting the given address family.
    pub fn family_flag(&self, family: AddressFamily) -> &str {
        match family {
            AddressFamily::Ipv4 => &self.ipv4_flag,
            AddressFamily::Ipv6 => &self.ipv6_flag,
        }
    }

    /// Arguments for one invocation: `[family, -c<count>, destination]`.
    pub fn args(&self, destination: &str, count: u32, family: AddressFamily) -> Vec<String> {
        vec![
            self.family_flag(family).to_string(),
            format!("-c{count}"),
            destination.to_string(),
        ]
    }
}
