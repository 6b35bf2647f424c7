//! Probe scheduling.
//!
//! One tokio task per destination runs probe cycles and sends each parsed
//! result into the shared results channel. Cycles of a destination never
//! overlap; different destinations run fully in parallel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::probe::{AddressFamily, OutputParser, ProbeExecutor, ProbeResult};

/// Minimum allowed interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Default timeout for graceful shutdown (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// When a destination is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// One cycle, then the task ends.
    Once,

    /// Repeat forever with this pause between the end of one cycle and the
    /// start of the next.
    Interval(Duration),
}

impl Schedule {
    /// Create an interval schedule.
    ///
    /// Interval is clamped to a minimum of 1 second.
    pub fn interval(duration: Duration) -> Self {
        if duration < MIN_INTERVAL {
            tracing::warn!(min_interval = ?MIN_INTERVAL,
                "Interval duration is less than minimum allowed. Using minimum duration."
            );
            Self::Interval(MIN_INTERVAL)
        } else {
            Self::Interval(duration)
        }
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Once => write!(f, "once"),
            Self::Interval(d) => write!(f, "every {:?}", d),
        }
    }
}

/// Per-run probe settings shared by every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Echo requests per probe.
    pub count: u32,
    pub schedule: Schedule,
    /// Probe IPv6 after IPv4 in every cycle.
    pub dual_stack: bool,
}

/// Outcome of joining every probe task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionReport {
    /// Tasks spawned.
    pub tasks: usize,
    /// Results handed to the channel.
    pub emitted: u64,
    /// Probes whose output could not be parsed.
    pub failed_cycles: u64,
    /// Tasks that panicked.
    pub panicked: usize,
    /// Tasks cancelled by a shutdown timeout.
    pub aborted: usize,
}

#[derive(Debug, Default)]
struct TaskSummary {
    emitted: u64,
    failed_cycles: u64,
}

/// Everything a probe task needs, cloned into each task.
#[derive(Clone)]
struct TaskContext {
    settings: SchedulerSettings,
    executor: Arc<dyn ProbeExecutor>,
    parser: Arc<OutputParser>,
    results_tx: mpsc::Sender<ProbeResult>,
}

/// Spawns and tracks the per-destination probe tasks.
pub struct ProbeScheduler {
    context: TaskContext,
    stop_tx: watch::Sender<bool>,
    tasks: JoinSet<TaskSummary>,
    spawned: usize,
}

impl std::fmt::Debug for ProbeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeScheduler")
            .field("settings", &self.context.settings)
            .field("tasks", &self.spawned)
            .finish_non_exhaustive()
    }
}

impl ProbeScheduler {
    /// Create a scheduler; no task runs until [`ProbeScheduler::spawn`].
    pub fn new(
        settings: SchedulerSettings,
        executor: impl ProbeExecutor,
        parser: OutputParser,
        results_tx: mpsc::Sender<ProbeResult>,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);

        Self {
            context: TaskContext {
                settings,
                executor: Arc::new(executor),
                parser: Arc::new(parser),
                results_tx,
            },
            stop_tx,
            tasks: JoinSet::new(),
            spawned: 0,
        }
    }

    /// Start the probe task for one destination.
    pub fn spawn(&mut self, destination: impl Into<String>) {
        let destination = destination.into();
        let context = self.context.clone();
        let stop_rx = self.stop_tx.subscribe();

        tracing::info!(
            destination = %destination,
            schedule = %context.settings.schedule,
            dual_stack = context.settings.dual_stack,
            "Probe task started"
        );
        self.tasks
            .spawn(run_probe_task(context, destination, stop_rx));
        self.spawned += 1;
    }

    /// Start one probe task per destination.
    pub fn spawn_all<I, S>(&mut self, destinations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for destination in destinations {
            self.spawn(destination);
        }
    }

    /// Number of tasks spawned.
    pub fn len(&self) -> usize {
        self.spawned
    }

    pub fn is_empty(&self) -> bool {
        self.spawned == 0
    }

    /// Wait for every task to end on its own.
    ///
    /// This is the one-shot completion barrier. With an interval schedule
    /// tasks only end once the results channel closes, so use
    /// [`ProbeScheduler::shutdown`] instead.
    pub async fn wait(mut self) -> CompletionReport {
        let mut report = CompletionReport {
            tasks: self.spawned,
            ..CompletionReport::default()
        };
        drain(&mut self.tasks, &mut report).await;

        tracing::info!(
            tasks = report.tasks,
            emitted = report.emitted,
            failed_cycles = report.failed_cycles,
            "All probe tasks completed"
        );
        report
    }

    /// Stop every task between cycles.
    ///
    /// Tasks still busy after `timeout` are aborted, which kills their
    /// child processes.
    pub async fn shutdown(mut self, timeout: Duration) -> CompletionReport {
        tracing::info!(tasks = self.spawned, "Stopping probe tasks");
        self.stop_tx.send_replace(true);

        let mut report = CompletionReport {
            tasks: self.spawned,
            ..CompletionReport::default()
        };

        let finished = tokio::time::timeout(timeout, drain(&mut self.tasks, &mut report)).await;
        if finished.is_err() {
            tracing::warn!(
                timeout = ?timeout,
                remaining = self.tasks.len(),
                "Probe tasks did not stop in time, aborting"
            );
            self.tasks.abort_all();
            drain(&mut self.tasks, &mut report).await;
        }

        tracing::info!(
            emitted = report.emitted,
            failed_cycles = report.failed_cycles,
            aborted = report.aborted,
            "Probe tasks stopped"
        );
        report
    }
}

async fn drain(tasks: &mut JoinSet<TaskSummary>, report: &mut CompletionReport) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(summary) => {
                report.emitted += summary.emitted;
                report.failed_cycles += summary.failed_cycles;
            }
            Err(e) if e.is_cancelled() => report.aborted += 1,
            Err(e) => {
                tracing::error!(error = %e, "Probe task panicked");
                report.panicked += 1;
            }
        }
    }
}

async fn run_probe_task(
    context: TaskContext,
    destination: String,
    mut stop_rx: watch::Receiver<bool>,
) -> TaskSummary {
    let settings = context.settings;
    let mut summary = TaskSummary::default();

    loop {
        for &family in AddressFamily::cycle(settings.dual_stack) {
            let output = context
                .executor
                .execute(&destination, settings.count, family)
                .await;

            match context.parser.parse(&destination, family, &output) {
                Ok(result) => {
                    // Suspends while the channel is full
                    if context.results_tx.send(result).await.is_err() {
                        tracing::warn!(
                            destination = %destination,
                            "Results channel closed, stopping probe task"
                        );
                        return summary;
                    }
                    summary.emitted += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        destination = %destination,
                        address_family = %family,
                        error = %e,
                        "Failed to parse probe output"
                    );
                    summary.failed_cycles += 1;
                }
            }
        }

        match settings.schedule {
            Schedule::Once => break,
            Schedule::Interval(interval) => {
                if *stop_rx.borrow() {
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = stop_rx.changed() => break,
                }
            }
        }
    }

    tracing::debug!(
        destination = %destination,
        emitted = summary.emitted,
        "Probe task finished"
    );
    summary
}
