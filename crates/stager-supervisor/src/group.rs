//! Fail-fast process group.

use std::sync::Arc;
use std::time::Duration;

use stager_core::{GroupState, WorkerState};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{GroupError, GroupResult, WorkerError};
use crate::worker::{WorkerContext, WorkerSpec};

/// Grace period used by the staging binary unless overridden.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// A flat set of workers that live and die together.
///
/// [`run`](Self::run) consumes the group, so each member is started exactly once.
/// A second run does not compile:
///
/// ```compile_fail
/// use stager_supervisor::ProcessGroup;
///
/// async fn run_twice(group: ProcessGroup) {
///     let _ = group.run().await;
///     let _ = group.run().await;
/// }
/// ```
pub struct ProcessGroup {
    members: Vec<WorkerSpec>,
    shutdown: CancellationToken,
    shutdown_grace: Option<Duration>,
}

/// Exit notification from a member's monitor task.
struct Exit {
    index: usize,
    result: Result<(), WorkerError>,
}

/// Group-side bookkeeping for one member.
struct Slot {
    name: Arc<str>,
    state: WorkerState,
    abort: AbortHandle,
}

impl ProcessGroup {
    /// Create a group. Members are started in no particular order.
    pub fn new(members: Vec<WorkerSpec>) -> Self {
        Self {
            members,
            shutdown: CancellationToken::new(),
            shutdown_grace: None,
        }
    }

    /// Bound how long the group waits for members after shutdown begins.
    ///
    /// Members still running when it elapses are aborted and reported as
    /// [`WorkerError::ShutdownTimeout`]. Without a grace period, or with one too
    /// large to represent as a deadline, the group waits indefinitely.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = Some(grace);
        self
    }

    /// Token whose cancellation stops every member.
    ///
    /// Cancelling it has exactly the same effect as a member exiting.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Run every member to completion.
    ///
    /// The first member to return triggers shutdown of all others. The result
    /// is the first error in completion order, or `Ok(())` if every member
    /// returned `Ok(())`.
    pub async fn run(self) -> GroupResult {
        let Self {
            members,
            shutdown,
            shutdown_grace,
        } = self;

        if members.is_empty() {
            debug!("Process group has no members");
            return Ok(());
        }

        let (exit_tx, mut exit_rx) = mpsc::unbounded_channel::<Exit>();
        let (ready_tx, mut ready_rx) = mpsc::unbounded_channel::<usize>();
        let (started_tx, mut started_rx) = mpsc::unbounded_channel::<usize>();
        let mut slots = Vec::with_capacity(members.len());

        for (index, spec) in members.into_iter().enumerate() {
            let name: Arc<str> = Arc::from(spec.name);
            let ctx = WorkerContext::new(
                index,
                name.clone(),
                shutdown.child_token(),
                ready_tx.clone(),
                spec.ready_signal,
            );

            debug!(worker = %name, "Starting worker");
            let started = started_tx.clone();
            let worker = spec.worker;
            let handle = tokio::spawn(async move {
                let _ = started.send(index);
                worker.run(ctx).await
            });
            let abort = handle.abort_handle();

            let exits = exit_tx.clone();
            tokio::spawn(async move {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => Err(WorkerError::Panicked),
                    Err(_) => Err(WorkerError::Cancelled),
                };
                let _ = exits.send(Exit { index, result });
            });

            slots.push(Slot {
                name,
                state: WorkerState::Starting,
                abort,
            });
        }
        drop(exit_tx);
        drop(ready_tx);
        drop(started_tx);

        let mut state = GroupState::Running;
        let mut remaining = slots.len();
        let mut result: GroupResult = Ok(());
        let mut drain_deadline: Option<Instant> = None;

        info!(members = remaining, "Process group running");

        loop {
            tokio::select! {
                Some(exit) = exit_rx.recv() => {
                    let slot = &mut slots[exit.index];
                    slot.state = WorkerState::Stopped;
                    remaining -= 1;

                    match exit.result {
                        Ok(()) => info!(worker = %slot.name, remaining, "Worker exited"),
                        Err(error) => {
                            error!(worker = %slot.name, error = %error, remaining, "Worker failed");
                            if result.is_ok() {
                                result = Err(GroupError {
                                    worker: slot.name.to_string(),
                                    error,
                                });
                            }
                        }
                    }

                    if remaining == 0 {
                        break;
                    }
                    if !shutdown.is_cancelled() {
                        info!(worker = %slot.name, "Worker exit ends the group, stopping peers");
                        shutdown.cancel();
                    }
                }
                Some(index) = started_rx.recv() => {
                    let slot = &mut slots[index];
                    if slot.state == WorkerState::Starting {
                        slot.state = WorkerState::Running;
                        debug!(worker = %slot.name, state = %slot.state, "Worker started");
                    }
                }
                Some(index) = ready_rx.recv() => {
                    info!(worker = %slots[index].name, "Worker ready");
                }
                _ = shutdown.cancelled(), if !state.is_shutting_down() => {
                    state = GroupState::Draining;
                    for slot in slots.iter_mut().filter(|s| s.state.accepts_signal()) {
                        slot.state = WorkerState::Stopping;
                        debug!(worker = %slot.name, "Termination signal delivered");
                    }
                    info!(remaining, state = %state, "Process group draining");
                    drain_deadline = shutdown_grace.and_then(|grace| Instant::now().checked_add(grace));
                    if shutdown_grace.is_some() && drain_deadline.is_none() {
                        warn!("Shutdown grace period out of range, waiting for members indefinitely");
                    }
                }
                _ = sleep_until(drain_deadline.unwrap_or_else(Instant::now)), if drain_deadline.is_some() => {
                    let grace = shutdown_grace.unwrap_or_default();
                    for slot in slots.iter_mut().filter(|s| !s.state.is_terminal()) {
                        warn!(worker = %slot.name, grace_secs = grace.as_secs_f64(), "Worker ignored termination, aborting");
                        slot.abort.abort();
                        slot.state = WorkerState::Stopped;
                        if result.is_ok() {
                            result = Err(GroupError {
                                worker: slot.name.to_string(),
                                error: WorkerError::ShutdownTimeout(grace),
                            });
                        }
                    }
                    break;
                }
                else => break,
            }
        }

        // Covers the all-exited-before-draining case as well.
        shutdown.cancel();
        state = GroupState::Done;
        match &result {
            Ok(()) => info!(state = %state, "Process group finished"),
            Err(e) => warn!(state = %state, error = %e, "Process group finished with error"),
        }

        result
    }
}
