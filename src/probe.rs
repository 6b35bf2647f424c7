//! Probe Layer
//!
//! Everything needed to turn one destination into one [`ProbeResult`]:
//!
//! - [`resolve_destinations`]: drop destinations that do not resolve
//! - [`ProbeProfile`]: binary path and output grammar of the platform's `ping`
//! - [`ProbeExecutor`] / [`CommandExecutor`]: run the external binary
//! - [`OutputParser`] / [`parse_output`]: turn its statistics into typed values
//!
//! # Example
//!
//! ```rust
//! use parallelping::probe::{ProbeProfile, ProfileKind, parse_output};
//!
//! let profile = ProbeProfile::for_kind(ProfileKind::Iputils);
//! let raw = "--- example.com ping statistics ---\n\
//!            5 packets transmitted, 5 received, 0% packet loss\n\
//!            rtt min/avg/max/mdev = 10.0/12.5/15.0/1.2 ms";
//!
//! let parsed = parse_output(raw, true, &profile).unwrap();
//! assert_eq!(parsed.hostname, "example.com");
//! assert_eq!(parsed.stats.avg_ms, 12.5);
//! ```

mod executor;
mod parser;
mod profile;
mod resolver;
mod types;

pub use executor::{CommandExecutor, ProbeExecutor, ProbeOutput};
pub use parser::{OutputParser, ParseError, ParsedOutput, parse_output, resolve_origin};
pub use profile::{ProbeProfile, ProfileKind};
pub use resolver::resolve_destinations;
pub use types::{AddressFamily, ProbeResult, ProbeStats};
