//! Relay from OS interrupts to process group shutdown.

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use crate::error::GroupResult;
use crate::group::ProcessGroup;

type Trigger = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Turns an external interrupt into a group shutdown.
///
/// The relay cancels the group's shutdown token, the same path a member exit
/// takes, so the group cannot tell the two apart. One relay serves one run and
/// its subscription is dropped when the run finishes.
pub struct SignalRelay {
    trigger: Trigger,
}

impl SignalRelay {
    /// Subscribe to SIGINT and SIGTERM.
    ///
    /// Handlers are installed immediately, so signals arriving before
    /// [`supervise`](Self::supervise) is polled are not lost. Must be called
    /// from within a tokio runtime.
    #[cfg(unix)]
    pub fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;

        Ok(Self::with_trigger(async move {
            tokio::select! {
                _ = interrupt.recv() => info!(signal = "SIGINT", "Interrupt received"),
                _ = terminate.recv() => info!(signal = "SIGTERM", "Interrupt received"),
            }
        }))
    }

    /// Subscribe to ctrl-c.
    #[cfg(not(unix))]
    pub fn new() -> std::io::Result<Self> {
        Ok(Self::with_trigger(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!(signal = "ctrl-c", "Interrupt received"),
                // Without a handler no interrupt can arrive.
                Err(_) => std::future::pending::<()>().await,
            }
        }))
    }

    /// Use an arbitrary future as the interrupt source.
    pub fn with_trigger<F>(trigger: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            trigger: Box::pin(trigger),
        }
    }

    /// Run `group`, stopping it when the interrupt fires.
    pub async fn supervise(self, group: ProcessGroup) -> GroupResult {
        let shutdown = group.shutdown_token();
        let mut trigger = self.trigger;
        let mut relayed = false;

        let run = group.run();
        tokio::pin!(run);

        loop {
            tokio::select! {
                result = &mut run => return result,
                _ = &mut trigger, if !relayed => {
                    relayed = true;
                    if !shutdown.is_cancelled() {
                        info!("Stopping process group on interrupt");
                        shutdown.cancel();
                    }
                }
            }
        }
    }
}
