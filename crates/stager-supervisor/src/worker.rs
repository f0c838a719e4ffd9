//! Worker contract and per-worker context.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

use crate::error::WorkerError;

/// A long-running unit of work supervised by a [`ProcessGroup`](crate::ProcessGroup).
///
/// Implementations should watch [`WorkerContext::stopped`] and return promptly
/// once it resolves. Cancellation is cooperative: the group never kills a
/// worker before its grace period runs out.
#[async_trait]
pub trait Worker: Send + 'static {
    /// Run until the work is done, it fails, or termination is requested.
    async fn run(self: Box<Self>, ctx: WorkerContext) -> Result<(), WorkerError>;
}

/// Worker built from a closure.
pub struct FnWorker<F> {
    f: F,
}

/// Wrap a closure as a [`Worker`].
pub fn worker_fn<F, Fut>(f: F) -> FnWorker<F>
where
    F: FnOnce(WorkerContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    FnWorker { f }
}

#[async_trait]
impl<F, Fut> Worker for FnWorker<F>
where
    F: FnOnce(WorkerContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    async fn run(self: Box<Self>, ctx: WorkerContext) -> Result<(), WorkerError> {
        (self.f)(ctx).await
    }
}

/// A named group member.
pub struct WorkerSpec {
    pub(crate) name: String,
    pub(crate) worker: Box<dyn Worker>,
    pub(crate) ready_signal: Option<ReadySignal>,
}

impl WorkerSpec {
    /// Create a member. The name is only used in diagnostics.
    pub fn new(name: impl Into<String>, worker: impl Worker) -> Self {
        Self {
            name: name.into(),
            worker: Box::new(worker),
            ready_signal: None,
        }
    }

    /// Open `signal` when this worker reports readiness.
    pub fn with_ready_signal(mut self, signal: ReadySignal) -> Self {
        self.ready_signal = Some(signal);
        self
    }

    /// Get the member name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Create a one-shot readiness barrier.
///
/// The [`ReadySignal`] is attached to the prerequisite worker's spec; the
/// dependent worker awaits the [`ReadyGate`] through
/// [`WorkerContext::wait_until_ready`].
pub fn readiness() -> (ReadySignal, ReadyGate) {
    let (tx, rx) = watch::channel(false);
    (ReadySignal { tx }, ReadyGate { rx })
}

/// Opening side of a readiness barrier.
#[derive(Debug)]
pub struct ReadySignal {
    tx: watch::Sender<bool>,
}

impl ReadySignal {
    fn open(&self) {
        self.tx.send_replace(true);
    }
}

/// Waiting side of a readiness barrier.
#[derive(Debug, Clone)]
pub struct ReadyGate {
    rx: watch::Receiver<bool>,
}

impl ReadyGate {
    /// Returns true if the prerequisite already reported ready.
    pub fn is_open(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Handle given to a worker for one run.
pub struct WorkerContext {
    index: usize,
    name: Arc<str>,
    shutdown: CancellationToken,
    ready_tx: mpsc::UnboundedSender<usize>,
    ready_signal: Option<ReadySignal>,
    reported: AtomicBool,
}

impl WorkerContext {
    pub(crate) fn new(
        index: usize,
        name: Arc<str>,
        shutdown: CancellationToken,
        ready_tx: mpsc::UnboundedSender<usize>,
        ready_signal: Option<ReadySignal>,
    ) -> Self {
        Self {
            index,
            name,
            shutdown,
            ready_tx,
            ready_signal,
            reported: AtomicBool::new(false),
        }
    }

    /// Name of this worker.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves once termination was requested.
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    /// Returns true once termination was requested.
    pub fn is_stopping(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token that is cancelled on termination, for handing to sub-tasks.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Tell the group this worker is ready. Only the first call has an effect.
    pub fn report_ready(&self) {
        if self.reported.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(worker = %self.name, "Reporting ready");
        if let Some(signal) = &self.ready_signal {
            signal.open();
        }
        // The group stops listening once it is done; nothing to report then.
        let _ = self.ready_tx.send(self.index);
    }

    /// Wait until `gate` opens.
    ///
    /// Fails with [`WorkerError::Cancelled`] if termination comes first. If the
    /// prerequisite returned without opening the gate, waits for termination
    /// and fails with [`WorkerError::NotReady`], so the prerequisite's own exit
    /// is reported before this one.
    pub async fn wait_until_ready(&self, gate: &ReadyGate) -> Result<(), WorkerError> {
        let mut rx = gate.rx.clone();
        let opened = async move { rx.wait_for(|ready| *ready).await.is_ok() };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(WorkerError::Cancelled),
            opened = opened => {
                if opened {
                    Ok(())
                } else {
                    debug!(worker = %self.name, "Prerequisite gone before ready, waiting for stop");
                    self.shutdown.cancelled().await;
                    Err(WorkerError::NotReady)
                }
            }
        }
    }
}
