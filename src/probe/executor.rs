//! External `ping` invocation.

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;

use crate::probe::{AddressFamily, ProbeProfile};

/// Captured output of one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutput {
    /// Standard output followed by standard error.
    pub raw: String,
    /// Whether the tool exited with status zero.
    pub succeeded: bool,
}

impl ProbeOutput {
    /// Output of a probe that could not be launched.
    pub fn launch_failed() -> Self {
        Self {
            raw: String::new(),
            succeeded: false,
        }
    }
}

/// Runs one probe against a destination.
///
/// Implementations never fail: a tool that cannot be started is reported
/// the same way as a tool that exited non-zero.
#[async_trait::async_trait]
pub trait ProbeExecutor: Send + Sync + 'static {
    /// Probe `destination` with `count` echo requests over `family`.
    async fn execute(&self, destination: &str, count: u32, family: AddressFamily) -> ProbeOutput;
}

/// Executor that spawns the profile's `ping` binary as a child process.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    profile: Arc<ProbeProfile>,
}

impl CommandExecutor {
    /// Create an executor for the given profile.
    pub fn new(profile: Arc<ProbeProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl ProbeExecutor for CommandExecutor {
    async fn execute(&self, destination: &str, count: u32, family: AddressFamily) -> ProbeOutput {
        let args = self.profile.args(destination, count, family);
        tracing::debug!(
            binary = %self.profile.binary.display(),
            args = ?args,
            "Running probe"
        );

        // No timeout here: the count flag bounds the tool's runtime.
        let output = Command::new(&self.profile.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    binary = %self.profile.binary.display(),
                    destination,
                    family = %family,
                    error = %e,
                    "Failed to launch probe"
                );
                return ProbeOutput::launch_failed();
            }
        };

        let mut raw = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            raw.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        tracing::trace!(destination, family = %family, %raw, "Raw probe output");

        let succeeded = output.status.success();
        if !succeeded {
            tracing::warn!(
                destination,
                family = %family,
                status = %output.status,
                "Probe exited with failure"
            );
        }

        ProbeOutput { raw, succeeded }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProfileKind;

    fn executor_with_binary(binary: &str) -> CommandExecutor {
        let profile = ProbeProfile::for_kind(ProfileKind::Iputils).with_binary(binary);
        CommandExecutor::new(Arc::new(profile))
    }

    #[tokio::test]
    async fn test_execute_passes_profile_args() {
        let executor = executor_with_binary("echo");
        let output = executor
            .execute("example.com", 3, AddressFamily::Ipv6)
            .await;

        assert!(output.succeeded);
        assert_eq!(output.raw.trim(), "-6 -c3 example.com");
    }

    #[tokio::test]
    async fn test_execute_nonzero_exit() {
        let executor = executor_with_binary("false");
        let output = executor.execute("example.com", 1, AddressFamily::Ipv4).await;

        assert!(!output.succeeded);
    }

    #[tokio::test]
    async fn test_execute_combines_stdout_and_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ping");
        std::fs::write(&script, "#!/bin/sh\necho out\necho err >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let profile = ProbeProfile::for_kind(ProfileKind::Iputils).with_binary(&script);
        let executor = CommandExecutor::new(Arc::new(profile));
        let output = executor.execute("example.com", 1, AddressFamily::Ipv4).await;

        assert!(!output.succeeded);
        assert_eq!(output.raw, "out\nerr\n");
    }

    #[tokio::test]
    async fn test_execute_missing_binary() {
        let executor = executor_with_binary("/nonexistent/parallelping-test-ping");
        let output = executor.execute("example.com", 1, AddressFamily::Ipv4).await;

        assert_eq!(output, ProbeOutput::launch_failed());
    }
}
