//! Process-isolated workers
//!
//! Each worker is a forked child with its own copy-on-write address space.
//! Before the first fork the parent maps one `MAP_SHARED | MAP_ANONYMOUS`
//! region holding a fixed-size header per slot, and creates one private spill
//! directory. A child writes only its own header and its own `slot-{n}` file
//! in that directory, so no lock is needed. Matches go to the spill file
//! because a shared mapping cannot grow after the fork.
//!
//! The parent holds no descriptor per slot: each child creates and closes its
//! own file, and the parent reads them back one at a time by path.
//!
//! ```text
//!   parent                         shared region (mmap)
//!   ──────                         ┌─────────┬─────────┬─────────┐
//!   open() ── map + spill dir ───▶ │ slot 0  │ slot 1  │ slot N  │
//!   spawn() ── fork ──┐            └────▲────┴────▲────┴────▲────┘
//!                     ├─ child 0 ───────┘         │         │
//!                     ├─ child 1 ─────────────────┘         │
//!                     └─ child N ───────────────────────────┘
//!   join() ── waitpid (barrier)
//!   into_table() ── read headers + spill files, then munmap
//! ```
//!
//! Children never log and leave through `_exit`, so no parent destructor or
//! buffered writer runs twice.

use crate::config::IsolationMode;
use crate::error::WorkerError;
use crate::scan::channel::{ResultChannel, WorkerHandle};
use crate::scan::partition::WorkItem;
use crate::scan::predicate::Predicate;
use crate::scan::table::ResultTable;
use crate::scan::worker::{self, WorkerIdentity, WorkerResult};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Slot has not been written
const SLOT_EMPTY: u32 = 0;

/// Slot holds a complete result
const SLOT_PUBLISHED: u32 = 1;

/// Child exit code when writing the spill file failed
const EXIT_SPILL_FAILED: i32 = 2;

/// Child exit code when the scan panicked
const EXIT_PANICKED: i32 = 3;

/// Child exit code when its slot was already published
const EXIT_ALREADY_PUBLISHED: i32 = 4;

/// Per-slot header in the shared region
///
/// All fields are atomics so both sides can access the mapping through
/// shared references. An all-zero header is a valid empty slot.
#[repr(C)]
#[derive(Debug)]
struct SlotHeader {
    state: AtomicU32,
    pid: AtomicI32,
    slot_id: AtomicU64,
    range_start: AtomicU64,
    range_end: AtomicU64,
    elapsed_millis: AtomicI64,
    match_count: AtomicU64,
}

/// Anonymous shared mapping of `SlotHeader`s, unmapped on drop
struct SharedRegion {
    base: NonNull<SlotHeader>,
    slots: usize,
    bytes: usize,
}

impl SharedRegion {
    /// Map a zero-filled region with room for `slots` headers
    fn map(slots: usize) -> io::Result<Self> {
        let bytes = slots.max(1) * mem::size_of::<SlotHeader>();

        // SAFETY: anonymous mapping with no address hint; result is checked below
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                bytes,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let base = NonNull::new(addr.cast::<SlotHeader>())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned null"))?;

        Ok(Self { base, slots, bytes })
    }

    fn slot(&self, index: usize) -> Option<&SlotHeader> {
        if index >= self.slots {
            return None;
        }
        // SAFETY: index is in bounds, the mapping is page aligned and
        // zero-filled, and zero is a valid value for every atomic field
        Some(unsafe { &*self.base.as_ptr().add(index) })
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        // SAFETY: base/bytes describe exactly the mapping created in `map`
        let rc = unsafe { libc::munmap(self.base.as_ptr().cast(), self.bytes) };
        if rc != 0 {
            warn!(error = %io::Error::last_os_error(), "munmap of result table failed");
        }
    }
}

/// A forked worker process
#[derive(Debug)]
pub struct ProcessHandle {
    slot: usize,
    pid: libc::pid_t,
}

impl ProcessHandle {
    /// Child process id
    pub fn pid(&self) -> i32 {
        self.pid
    }
}

impl WorkerHandle for ProcessHandle {
    fn slot(&self) -> usize {
        self.slot
    }

    fn spawned_as(&self) -> Option<WorkerIdentity> {
        Some(WorkerIdentity::Pid(self.pid))
    }
}

/// Result channel for process-isolated workers
pub struct ProcessChannel {
    region: SharedRegion,
    /// Spill file path per slot; files exist only once a child creates them
    spill_paths: Vec<PathBuf>,
    predicate: Predicate,
    /// Children forked but not yet reaped
    live: Vec<libc::pid_t>,
    // Removed after Drop has reaped every child
    spill_dir: TempDir,
}

impl ResultChannel for ProcessChannel {
    type Handle = ProcessHandle;

    const MODE: IsolationMode = IsolationMode::Process;

    fn open(slots: usize, predicate: Predicate) -> Result<Self, WorkerError> {
        let init_err = |e: io::Error| WorkerError::ChannelInit {
            slots,
            reason: e.to_string(),
        };

        let region = SharedRegion::map(slots).map_err(init_err)?;
        let spill_dir = tempfile::Builder::new()
            .prefix("narc-scan-")
            .tempdir()
            .map_err(init_err)?;
        let spill_paths = (0..slots)
            .map(|slot| spill_dir.path().join(format!("slot-{}", slot)))
            .collect();

        debug!(
            slots = slots,
            bytes = region.bytes,
            spill_dir = %spill_dir.path().display(),
            "Shared result table mapped"
        );

        Ok(Self {
            region,
            spill_paths,
            predicate,
            live: Vec::with_capacity(slots),
            spill_dir,
        })
    }

    fn spawn(&mut self, item: &WorkItem) -> Result<ProcessHandle, WorkerError> {
        let slot = item.slot_id;
        let header = self.region.slot(slot).ok_or(WorkerError::SlotOutOfRange {
            slot,
            slots: self.region.slots,
        })?;
        let spill = self.spill_paths[slot].as_path();

        // SAFETY: the child only scans, writes its own header and spill file,
        // and leaves through _exit without returning into parent code
        let pid = unsafe { libc::fork() };

        match pid {
            -1 => Err(WorkerError::SpawnFailed {
                slot,
                reason: io::Error::last_os_error().to_string(),
            }),
            0 => run_child(item, self.predicate, header, spill),
            pid => {
                self.live.push(pid);
                Ok(ProcessHandle { slot, pid })
            }
        }
    }

    fn join(&mut self, handle: ProcessHandle) -> Result<(), WorkerError> {
        let status = wait_for(handle.pid);
        self.live.retain(|&pid| pid != handle.pid);

        let status = status.map_err(|e| WorkerError::Exited {
            slot: handle.slot,
            pid: handle.pid,
            status: format!("waitpid failed: {}", e),
        })?;

        if libc::WIFEXITED(status) && libc::WEXITSTATUS(status) == 0 {
            return Ok(());
        }

        Err(WorkerError::Exited {
            slot: handle.slot,
            pid: handle.pid,
            status: describe_status(status),
        })
    }

    fn into_table(self) -> Result<ResultTable, WorkerError> {
        let slots = (0..self.region.slots)
            .map(|slot| self.read_slot(slot))
            .collect::<Result<Vec<_>, _>>()?;

        ResultTable::from_slots(slots)
    }
}

impl ProcessChannel {
    /// Read one slot back after its child has been reaped
    fn read_slot(&self, slot: usize) -> Result<Option<WorkerResult>, WorkerError> {
        let Some(header) = self.region.slot(slot) else {
            return Ok(None);
        };

        if header.state.load(Ordering::Acquire) != SLOT_PUBLISHED {
            return Ok(None);
        }

        let spill_err = |reason: String| WorkerError::Spill { slot, reason };

        let count = header.match_count.load(Ordering::Relaxed) as usize;
        let bytes = fs::read(&self.spill_paths[slot]).map_err(|e| spill_err(e.to_string()))?;
        let expected = count * mem::size_of::<u64>();
        if bytes.len() != expected {
            return Err(spill_err(format!(
                "expected {} bytes, found {}",
                expected,
                bytes.len()
            )));
        }

        let matches = bytes
            .chunks_exact(mem::size_of::<u64>())
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                u64::from_le_bytes(raw)
            })
            .collect();

        Ok(Some(WorkerResult {
            identity: WorkerIdentity::Pid(header.pid.load(Ordering::Relaxed)),
            slot_id: header.slot_id.load(Ordering::Relaxed) as usize,
            range_start: header.range_start.load(Ordering::Relaxed),
            range_end: header.range_end.load(Ordering::Relaxed),
            elapsed_millis: header.elapsed_millis.load(Ordering::Relaxed),
            matches,
        }))
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        // Never leave a child unreaped, and never unmap under a running child
        for pid in self.live.drain(..) {
            if let Err(e) = wait_for(pid) {
                warn!(pid = pid, error = %e, "Failed to reap worker process");
            }
        }
    }
}

/// Why a child could not publish
enum ChildFailure {
    Spill,
    AlreadyPublished,
}

impl From<io::Error> for ChildFailure {
    fn from(_: io::Error) -> Self {
        ChildFailure::Spill
    }
}

/// Body of a forked child; never returns
fn run_child(item: &WorkItem, predicate: Predicate, header: &SlotHeader, spill: &Path) -> ! {
    let code = match panic::catch_unwind(AssertUnwindSafe(|| {
        publish_from_child(item, predicate, header, spill)
    })) {
        Ok(Ok(())) => 0,
        Ok(Err(ChildFailure::Spill)) => EXIT_SPILL_FAILED,
        Ok(Err(ChildFailure::AlreadyPublished)) => EXIT_ALREADY_PUBLISHED,
        Err(_) => EXIT_PANICKED,
    };

    // SAFETY: _exit skips atexit handlers and destructors inherited from the parent
    unsafe { libc::_exit(code) }
}

/// Scan, spill matches, then publish the header
fn publish_from_child(
    item: &WorkItem,
    predicate: Predicate,
    header: &SlotHeader,
    spill: &Path,
) -> Result<(), ChildFailure> {
    if header.state.load(Ordering::Acquire) != SLOT_EMPTY {
        return Err(ChildFailure::AlreadyPublished);
    }

    let output = worker::scan(item, predicate);

    // Closed before the header is published
    {
        let mut writer = BufWriter::new(File::create(spill)?);
        for m in &output.matches {
            writer.write_all(&m.to_le_bytes())?;
        }
        writer.flush()?;
    }

    // SAFETY: getpid has no preconditions
    header.pid.store(unsafe { libc::getpid() }, Ordering::Relaxed);
    header.slot_id.store(item.slot_id as u64, Ordering::Relaxed);
    header.range_start.store(item.range_start, Ordering::Relaxed);
    header.range_end.store(item.range_end, Ordering::Relaxed);
    header.elapsed_millis.store(output.elapsed_millis, Ordering::Relaxed);
    header
        .match_count
        .store(output.matches.len() as u64, Ordering::Relaxed);

    // The only state transition a child ever makes
    header
        .state
        .compare_exchange(SLOT_EMPTY, SLOT_PUBLISHED, Ordering::Release, Ordering::Relaxed)
        .map_err(|_| ChildFailure::AlreadyPublished)?;

    Ok(())
}

/// Block in waitpid until `pid` exits, retrying on EINTR
fn wait_for(pid: libc::pid_t) -> io::Result<libc::c_int> {
    let mut status: libc::c_int = 0;
    loop {
        // SAFETY: status points to a valid c_int
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc == pid {
            return Ok(status);
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn describe_status(status: libc::c_int) -> String {
    if libc::WIFEXITED(status) {
        match libc::WEXITSTATUS(status) {
            EXIT_SPILL_FAILED => "failed to write matches".to_string(),
            EXIT_PANICKED => "scan panicked".to_string(),
            EXIT_ALREADY_PUBLISHED => "slot was already published".to_string(),
            code => format!("exit code {}", code),
        }
    } else if libc::WIFSIGNALED(status) {
        format!("killed by signal {}", libc::WTERMSIG(status))
    } else {
        format!("wait status {:#x}", status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::predicate::is_narcissistic;

    fn item(slot_id: usize, range_start: u64, range_end: u64) -> WorkItem {
        WorkItem {
            slot_id,
            range_start,
            range_end,
        }
    }

    fn even(n: u64) -> bool {
        n % 2 == 0
    }

    fn explode(_: u64) -> bool {
        panic!("predicate exploded")
    }

    #[test]
    fn test_region_starts_empty() {
        let region = SharedRegion::map(4).unwrap();
        for i in 0..4 {
            assert_eq!(region.slot(i).unwrap().state.load(Ordering::Acquire), SLOT_EMPTY);
        }
        assert!(region.slot(4).is_none());
    }

    #[test]
    fn test_fork_join_collect() {
        let mut channel = ProcessChannel::open(2, is_narcissistic).unwrap();
        let a = channel.spawn(&item(0, 1, 300)).unwrap();
        let b = channel.spawn(&item(1, 301, 1000)).unwrap();
        assert_eq!(a.spawned_as(), Some(WorkerIdentity::Pid(a.pid())));

        let pid_b = b.pid();
        channel.join(b).unwrap();
        channel.join(a).unwrap();

        let table = channel.into_table().unwrap();
        assert_eq!(table[0].matches, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 153]);
        assert_eq!(table[1].matches, vec![370, 371, 407]);
        assert_eq!(table[1].identity, WorkerIdentity::Pid(pid_b));
        assert_eq!((table[1].range_start, table[1].range_end), (301, 1000));
    }

    #[test]
    fn test_large_match_list_survives_fork() {
        let mut channel = ProcessChannel::open(1, even).unwrap();
        let h = channel.spawn(&item(0, 1, 100_000)).unwrap();
        channel.join(h).unwrap();

        let table = channel.into_table().unwrap();
        assert_eq!(table[0].matches.len(), 50_000);
        assert_eq!(table[0].matches.last(), Some(&100_000));
    }

    #[test]
    fn test_panicking_child_reported() {
        let mut channel = ProcessChannel::open(1, explode).unwrap();
        let h = channel.spawn(&item(0, 1, 1)).unwrap();
        let err = channel.join(h).unwrap_err();
        assert!(matches!(err, WorkerError::Exited { slot: 0, .. }));
        assert!(err.to_string().contains("panicked"));
        assert!(matches!(
            channel.into_table(),
            Err(WorkerError::Unpublished { slot: 0 })
        ));
    }

    #[test]
    fn test_open_holds_no_file_per_slot() {
        let channel = ProcessChannel::open(crate::config::MAX_WORKERS, is_narcissistic).unwrap();
        assert_eq!(channel.spill_paths.len(), crate::config::MAX_WORKERS);
        assert_eq!(fs::read_dir(channel.spill_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_spill_dir_removed_on_drop() {
        let mut channel = ProcessChannel::open(1, is_narcissistic).unwrap();
        let dir = channel.spill_dir.path().to_path_buf();
        let h = channel.spawn(&item(0, 1, 500)).unwrap();
        channel.join(h).unwrap();
        assert!(dir.join("slot-0").exists());

        let table = channel.into_table().unwrap();
        assert_eq!(table[0].matches.len(), 13);
        assert!(!dir.exists());
    }

    #[test]
    fn test_republish_rejected_by_child() {
        let mut channel = ProcessChannel::open(1, is_narcissistic).unwrap();
        channel
            .region
            .slot(0)
            .unwrap()
            .state
            .store(SLOT_PUBLISHED, Ordering::Release);

        let h = channel.spawn(&item(0, 1, 10)).unwrap();
        let err = channel.join(h).unwrap_err();
        assert!(matches!(err, WorkerError::Exited { slot: 0, .. }));
        assert!(err.to_string().contains("already published"));
    }

    #[test]
    fn test_drop_reaps_unjoined_children() {
        let mut channel = ProcessChannel::open(1, is_narcissistic).unwrap();
        let h = channel.spawn(&item(0, 1, 10)).unwrap();
        let pid = h.pid();
        drop(channel);

        // Already reaped by drop: waitpid reports no such child
        let err = wait_for(pid).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ECHILD));
    }
}
