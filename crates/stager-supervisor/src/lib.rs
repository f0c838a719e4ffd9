//! Process group supervision for the staging builder.
//!
//! A [`ProcessGroup`] runs a flat set of named [`Worker`]s concurrently and
//! reduces their outcomes to one [`GroupResult`]:
//!
//! - the first worker to return, successfully or not, ends the group and every
//!   other worker receives its termination signal;
//! - the group waits for every worker to return (bounded by an optional grace
//!   period) before finishing;
//! - the result is the first error in completion order, or `Ok(())`.
//!
//! A [`SignalRelay`] feeds OS interrupts into the same shutdown path.
//!
//! # Example
//!
//! ```rust,no_run
//! use stager_supervisor::{worker_fn, ProcessGroup, SignalRelay, WorkerSpec};
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let group = ProcessGroup::new(vec![
//!         WorkerSpec::new("ticker", worker_fn(|ctx| async move {
//!             ctx.stopped().await;
//!             Ok(())
//!         })),
//!     ]);
//!
//!     SignalRelay::new()?.supervise(group).await?;
//!     Ok(())
//! }
//! ```

mod error;
mod group;
mod signal;
mod worker;

pub use error::{BoxError, GroupError, GroupResult, WorkerError};
pub use group::{ProcessGroup, DEFAULT_SHUTDOWN_GRACE};
pub use signal::SignalRelay;
pub use worker::{readiness, worker_fn, FnWorker, ReadyGate, ReadySignal, Worker, WorkerContext, WorkerSpec};
