//! Thread-isolated workers
//!
//! All workers share one address space and one result table. The table is
//! ordinary shared memory, so every publish (thread id lookup, write-once
//! check and slot write) happens under a single mutex even though slots never
//! logically overlap.

use crate::config::IsolationMode;
use crate::error::WorkerError;
use crate::scan::channel::{panic_message, ResultChannel, WorkerHandle};
use crate::scan::partition::WorkItem;
use crate::scan::predicate::Predicate;
use crate::scan::table::ResultTable;
use crate::scan::worker::{self, ScanOutput, WorkerIdentity, WorkerResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::trace;

/// Mutex-guarded result table shared by all worker threads
#[derive(Debug, Clone)]
pub struct SharedTable {
    slots: Arc<Mutex<Vec<Option<WorkerResult>>>>,
}

impl SharedTable {
    /// Create a table with `slots` empty slots
    pub fn with_slots(slots: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(vec![None; slots])),
        }
    }

    /// Publish a finished scan into the item's slot, exactly once
    ///
    /// The calling thread's id is recorded as the slot's identity.
    pub fn publish(&self, item: &WorkItem, output: ScanOutput) -> Result<(), WorkerError> {
        let mut slots = self.slots.lock();
        let len = slots.len();

        let slot = slots
            .get_mut(item.slot_id)
            .ok_or(WorkerError::SlotOutOfRange {
                slot: item.slot_id,
                slots: len,
            })?;

        if slot.is_some() {
            return Err(WorkerError::AlreadyPublished { slot: item.slot_id });
        }

        *slot = Some(WorkerResult::new(
            WorkerIdentity::current_thread(),
            item,
            output,
        ));

        Ok(())
    }

    /// Take the raw slots out of the table
    fn into_slots(self) -> Vec<Option<WorkerResult>> {
        match Arc::try_unwrap(self.slots) {
            Ok(slots) => slots.into_inner(),
            // A worker still holds a clone; its slot is final once joined
            Err(shared) => std::mem::take(&mut *shared.lock()),
        }
    }
}

/// A spawned worker thread
pub struct ThreadHandle {
    slot: usize,
    handle: JoinHandle<Result<(), WorkerError>>,
}

impl WorkerHandle for ThreadHandle {
    fn slot(&self) -> usize {
        self.slot
    }

    fn spawned_as(&self) -> Option<WorkerIdentity> {
        None
    }
}

/// Result channel for thread-isolated workers
pub struct ThreadChannel {
    table: SharedTable,
    predicate: Predicate,
}

impl ResultChannel for ThreadChannel {
    type Handle = ThreadHandle;

    const MODE: IsolationMode = IsolationMode::Thread;

    fn open(slots: usize, predicate: Predicate) -> Result<Self, WorkerError> {
        Ok(Self {
            table: SharedTable::with_slots(slots),
            predicate,
        })
    }

    fn spawn(&mut self, item: &WorkItem) -> Result<ThreadHandle, WorkerError> {
        let table = self.table.clone();
        let predicate = self.predicate;
        let item = *item;
        let slot = item.slot_id;

        let handle = thread::Builder::new()
            .name(format!("scan-{}", slot))
            .spawn(move || {
                let output = worker::scan(&item, predicate);
                trace!(
                    slot = item.slot_id,
                    matches = output.matches.len(),
                    elapsed_ms = output.elapsed_millis,
                    "Worker finished scan"
                );
                table.publish(&item, output)
            })
            .map_err(|e| WorkerError::SpawnFailed {
                slot,
                reason: e.to_string(),
            })?;

        Ok(ThreadHandle { slot, handle })
    }

    fn join(&mut self, handle: ThreadHandle) -> Result<(), WorkerError> {
        match handle.handle.join() {
            Ok(result) => result,
            Err(payload) => Err(WorkerError::Panicked {
                slot: handle.slot,
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn into_table(self) -> Result<ResultTable, WorkerError> {
        ResultTable::from_slots(self.table.into_slots())
    }
}
