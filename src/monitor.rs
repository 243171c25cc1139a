use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};

use crate::builds::{Activity, BuildRecord, BuildStatus, Snapshot};
use crate::error::{MonitorError, Result};
use crate::feed::FeedSource;
use crate::notifier::Notifier;

/// A build state change worth telling someone about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEvent {
    StillFailing,
    Fixed,
    Failed,
    Building,
}

impl BuildEvent {
    pub fn label(self) -> &'static str {
        match self {
            Self::StillFailing => "Still failing",
            Self::Fixed => "Fixed",
            Self::Failed => "Failed",
            Self::Building => "Building",
        }
    }
}

impl fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies a new build given the previous status (`None` for a new project).
///
/// Success after success is deliberately silent.
pub fn classify(old: Option<&BuildStatus>, new: &BuildStatus) -> Option<BuildEvent> {
    match (old, new) {
        (Some(BuildStatus::Failure), BuildStatus::Failure) => Some(BuildEvent::StillFailing),
        (Some(BuildStatus::Failure), BuildStatus::Success) => Some(BuildEvent::Fixed),
        (_, BuildStatus::Failure) => Some(BuildEvent::Failed),
        _ => None,
    }
}

/// A notification decided by [`diff_snapshots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub build: BuildRecord,
    pub event: BuildEvent,
}

/// Compares `current` against `previous` and returns the notifications it warrants.
///
/// Projects that just started building get their build number bumped in
/// `current`, because the feed still reports the last completed build. No
/// notifications are produced when there is no previous snapshot, and projects
/// in `exclude` never produce any.
pub fn diff_snapshots(
    previous: Option<&Snapshot>,
    current: &mut Snapshot,
    exclude: &HashSet<String>,
) -> Vec<Notification> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let mut notifications = Vec::new();

    for build in current.iter_mut() {
        if exclude.contains(&build.name) {
            continue;
        }

        let old = previous.get(&build.name);

        let changed = old.map_or(true, |old| old.number != build.number);
        if changed {
            if let Some(event) = classify(old.map(|old| &old.status), &build.status) {
                notifications.push(Notification {
                    build: build.clone(),
                    event,
                });
            }
        }

        let Some(old) = old else {
            continue;
        };
        if old.activity != Activity::Building && build.activity == Activity::Building {
            match build.number.next() {
                Some(next) => build.number = next,
                None => warn!(
                    "Build label '{}' of {} is not numeric, reporting it unchanged",
                    build.number, build.name
                ),
            }
            notifications.push(Notification {
                build: build.clone(),
                event: BuildEvent::Building,
            });
        }
    }

    notifications
}

/// What happened during one successful cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub delivered: Vec<Notification>,
    pub failed: Vec<(Notification, MonitorError)>,
}

/// Tracks build state between polls and notifies on transitions.
pub struct BuildMonitor<S, N> {
    source: S,
    notifier: N,
    exclude: HashSet<String>,
    previous: Option<Snapshot>,
}

impl<S: FeedSource, N: Notifier> BuildMonitor<S, N> {
    pub fn new(source: S, notifier: N, exclude: impl IntoIterator<Item = String>) -> Self {
        Self {
            source,
            notifier,
            exclude: exclude.into_iter().collect(),
            previous: None,
        }
    }

    /// The snapshot retained from the last successful cycle.
    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Runs one fetch, diff and notify pass.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Fetch`] if the feed cannot be read; the retained
    /// snapshot is left untouched. Delivery failures do not abort the cycle and
    /// are listed in the report instead.
    pub async fn process_cycle(&mut self) -> Result<CycleReport> {
        let mut current = self.source.fetch().await?;

        if current.is_empty() {
            warn!("Build feed lists no projects");
        }
        if self.previous.is_none() {
            info!("Tracking {} projects", current.len());
        }

        let notifications = diff_snapshots(self.previous.as_ref(), &mut current, &self.exclude);
        debug!("{} notifications this cycle", notifications.len());

        let mut report = CycleReport::default();
        for notification in notifications {
            match self
                .notifier
                .notify(&notification.build, notification.event)
                .await
            {
                Ok(()) => report.delivered.push(notification),
                Err(e) => report.failed.push((notification, e)),
            }
        }

        self.previous = Some(current);
        Ok(report)
    }

    /// Polls every `interval` until `max_cycles` cycles have run (forever if
    /// `None`) or Ctrl-C is received.
    ///
    /// # Errors
    ///
    /// Returns any non-retryable error raised by a cycle.
    pub async fn run(&mut self, interval: Duration, max_cycles: Option<usize>) -> Result<()> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(interval, max_cycles, ctrl_c).await
    }

    /// Like [`BuildMonitor::run`], but stops when `shutdown` completes.
    ///
    /// A cycle in flight when `shutdown` fires runs to completion and the loop
    /// stops right after it. Fetch failures are logged and retried after the
    /// same interval.
    ///
    /// # Errors
    ///
    /// Returns any non-retryable error raised by a cycle.
    pub async fn run_until<F>(
        &mut self,
        interval: Duration,
        max_cycles: Option<usize>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0;

        loop {
            let cycle = self.process_cycle();
            tokio::pin!(cycle);

            let mut interrupted = false;
            let outcome = tokio::select! {
                biased;
                () = &mut shutdown => {
                    interrupted = true;
                    None
                }
                outcome = &mut cycle => Some(outcome),
            };
            let outcome = match outcome {
                Some(outcome) => outcome,
                None => {
                    info!("Interrupted, finishing the current cycle");
                    cycle.await
                }
            };

            match outcome {
                Ok(report) => {
                    debug!("Delivered {} notifications", report.delivered.len());
                    for (notification, e) in &report.failed {
                        warn!(
                            "Notification '{}' for {} was not delivered: {e}",
                            notification.event, notification.build.name
                        );
                    }
                }
                Err(e) if e.is_retryable() => warn!("Update failed: {e}"),
                Err(e) => return Err(e),
            }

            if interrupted {
                info!("Stopping");
                return Ok(());
            }

            cycles += 1;
            if max_cycles.is_some_and(|max| cycles >= max) {
                return Ok(());
            }

            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                () = &mut shutdown => {
                    info!("Interrupted, stopping");
                    return Ok(());
                }
            }
        }
    }
}
