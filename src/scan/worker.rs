//! Worker scan logic
//!
//! Each worker:
//! - Records a start instant
//! - Scans every number of its sub-range in ascending order
//! - Collects matches into a growable vector (no capacity limit)
//! - Records its elapsed time, rounded half-up to milliseconds
//!
//! Publishing the result is the job of the [`ResultChannel`](super::channel::ResultChannel)
//! the worker was spawned by.

use crate::scan::partition::WorkItem;
use crate::scan::predicate::Predicate;
use std::fmt;
use std::time::{Duration, Instant};

/// Who ran a slot: a child process id or a kernel thread id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerIdentity {
    /// Forked child process
    Pid(i32),
    /// OS thread
    Tid(u64),
}

impl WorkerIdentity {
    /// Identity of the calling thread
    pub fn current_thread() -> Self {
        WorkerIdentity::Tid(current_tid())
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerIdentity::Pid(pid) => write!(f, "{}", pid),
            WorkerIdentity::Tid(tid) => write!(f, "{}", tid),
        }
    }
}

#[cfg(target_os = "linux")]
fn current_tid() -> u64 {
    // SAFETY: gettid takes no arguments and always succeeds
    unsafe { libc::syscall(libc::SYS_gettid) as u64 }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn current_tid() -> u64 {
    // SAFETY: pthread_self always succeeds
    unsafe { libc::pthread_self() as usize as u64 }
}

#[cfg(not(unix))]
fn current_tid() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static TID: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    TID.with(|tid| *tid)
}

/// Raw output of scanning one sub-range, before identity is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutput {
    /// Matching numbers, ascending
    pub matches: Vec<u64>,

    /// Scan time in milliseconds, rounded half-up
    pub elapsed_millis: i64,
}

/// A worker's completed result, as stored in its table slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResult {
    /// Process or thread that ran the scan
    pub identity: WorkerIdentity,

    /// Slot this result belongs to
    pub slot_id: usize,

    /// First scanned number
    pub range_start: u64,

    /// Last scanned number
    pub range_end: u64,

    /// Scan time in milliseconds
    pub elapsed_millis: i64,

    /// Matching numbers, ascending
    pub matches: Vec<u64>,
}

impl WorkerResult {
    /// Attach identity and range information to a scan output
    pub fn new(identity: WorkerIdentity, item: &WorkItem, output: ScanOutput) -> Self {
        Self {
            identity,
            slot_id: item.slot_id,
            range_start: item.range_start,
            range_end: item.range_end,
            elapsed_millis: output.elapsed_millis,
            matches: output.matches,
        }
    }
}

/// Scan every number in the item's range
pub fn scan(item: &WorkItem, predicate: Predicate) -> ScanOutput {
    let started = Instant::now();

    let matches: Vec<u64> = (item.range_start..=item.range_end)
        .filter(|&n| predicate(n))
        .collect();

    ScanOutput {
        matches,
        elapsed_millis: round_millis(started.elapsed()),
    }
}

/// Scan the item's range and build the result for the given identity
pub fn run(item: &WorkItem, predicate: Predicate, identity: WorkerIdentity) -> WorkerResult {
    WorkerResult::new(identity, item, scan(item, predicate))
}

/// Convert a duration to whole milliseconds, rounding half-up
pub fn round_millis(duration: Duration) -> i64 {
    ((duration.as_micros() + 500) / 1000) as i64
}
