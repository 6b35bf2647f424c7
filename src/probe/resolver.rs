//! Destination existence check.

use std::collections::HashSet;
use std::net::IpAddr;

/// Whether `destination` resolves to at least one address.
async fn destination_exists(destination: &str) -> Result<bool, std::io::Error> {
    // IP literals need no lookup
    if destination.parse::<IpAddr>().is_ok() {
        return Ok(true);
    }

    let mut addrs = tokio::net::lookup_host(format!("{destination}:0")).await?;
    Ok(addrs.next().is_some())
}

/// Keep the destinations that resolve, in input order.
///
/// Names are kept as given, not replaced by their addresses. Empty entries
/// and repeats are skipped. A lookup failure drops the destination for the
/// lifetime of the process; it is logged, never returned.
pub async fn resolve_destinations<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut valid = Vec::new();

    for name in names {
        let name = name.as_ref().trim();
        if name.is_empty() || !seen.insert(name.to_string()) {
            continue;
        }

        match destination_exists(name).await {
            Ok(true) => valid.push(name.to_string()),
            Ok(false) => {
                tracing::warn!(destination = name, "Destination has no addresses, skipping");
            }
            Err(e) => {
                tracing::warn!(destination = name, error = %e, "Failed to resolve destination, skipping");
            }
        }
    }

    tracing::info!(destinations = ?valid, "Destinations to probe");
    valid
}
