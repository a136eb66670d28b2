//! Result publication channels
//!
//! A channel owns the result table for one run and knows how to start and
//! reap workers that write into it. Two implementations share the same
//! coordinator:
//!
//! ```text
//!   ThreadChannel                          ProcessChannel (unix)
//!   ─────────────                          ─────────────────────
//!   std::thread per slot                   fork(2) per slot
//!   Arc<Mutex<Vec<Option<Result>>>>        MAP_SHARED slot headers
//!   publish = lock + tid + write-once      publish = own header only, no lock
//!   barrier = JoinHandle::join             + per-slot spill file for matches
//!                                          barrier = waitpid
//! ```
//!
//! In both cases the coordinator reads a slot only after the join of the
//! worker that owns it has returned.

pub mod thread;

#[cfg(unix)]
pub mod process;

pub use thread::{SharedTable, ThreadChannel, ThreadHandle};

#[cfg(unix)]
pub use process::{ProcessChannel, ProcessHandle};

use crate::config::IsolationMode;
use crate::error::WorkerError;
use crate::scan::partition::WorkItem;
use crate::scan::predicate::Predicate;
use crate::scan::table::ResultTable;
use crate::scan::worker::WorkerIdentity;

/// A running worker as seen by the coordinator
pub trait WorkerHandle {
    /// Slot the worker publishes into
    fn slot(&self) -> usize;

    /// OS identity, if known at spawn time
    fn spawned_as(&self) -> Option<WorkerIdentity>;
}

/// Isolation strategy: spawns workers and carries their results back
pub trait ResultChannel: Sized {
    /// Handle returned by `spawn` and consumed by `join`
    type Handle: WorkerHandle;

    /// Isolation model this channel implements
    const MODE: IsolationMode;

    /// Allocate a table with `slots` empty slots
    ///
    /// Called before any worker is spawned.
    fn open(slots: usize, predicate: Predicate) -> Result<Self, WorkerError>;

    /// Start a worker for `item`; it publishes into `item.slot_id`
    fn spawn(&mut self, item: &WorkItem) -> Result<Self::Handle, WorkerError>;

    /// Block until the worker has finished
    fn join(&mut self, handle: Self::Handle) -> Result<(), WorkerError>;

    /// Collect every slot once all workers are joined
    fn into_table(self) -> Result<ResultTable, WorkerError>;
}

/// Human-readable message from a thread panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Worker thread panicked".to_string()
    }
}
