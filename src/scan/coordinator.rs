//! Scan coordinator - orchestrates one parallel scan
//!
//! The coordinator is responsible for:
//! - Allocating the result table before any worker starts
//! - Spawning one worker per work item, in slot order
//! - Joining every spawned worker, including on the error path
//! - Measuring overall wall-clock time
//! - Handing the completed table to the report stage

use crate::config::{IsolationMode, ScanConfig};
use crate::error::{Result, WorkerError};
use crate::report::{aggregate, Report};
use crate::scan::channel::{ResultChannel, ThreadChannel, WorkerHandle};
use crate::scan::partition::{partition, WorkItem};
use crate::scan::predicate::{is_narcissistic, Predicate};
use crate::scan::table::ResultTable;
use crate::scan::worker::round_millis;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use crate::scan::channel::ProcessChannel;

/// Completed table plus the parent-observed wall time
#[derive(Debug)]
pub struct CoordinatorOutcome {
    /// One result per slot
    pub table: ResultTable,

    /// Time from before the first spawn to after the last join
    pub overall: Duration,
}

impl CoordinatorOutcome {
    /// Overall time in milliseconds, rounded half-up
    pub fn overall_millis(&self) -> i64 {
        round_millis(self.overall)
    }
}

/// Spawn → join → collect over one isolation strategy
pub struct Coordinator<C: ResultChannel> {
    predicate: Predicate,
    _channel: PhantomData<C>,
}

impl<C: ResultChannel> Coordinator<C> {
    /// Create a coordinator whose workers apply `predicate`
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            _channel: PhantomData,
        }
    }

    /// Allocate a table sized to `items` and run one worker per item
    pub fn run_all(&self, items: &[WorkItem]) -> std::result::Result<CoordinatorOutcome, WorkerError> {
        let channel = C::open(items.len(), self.predicate)?;
        debug!(mode = %C::MODE, slots = items.len(), "Result table allocated");
        self.run_on(channel, items)
    }

    /// Run one worker per item on an already allocated channel
    ///
    /// If a spawn fails, every worker already started is still joined before
    /// the spawn error is returned.
    pub fn run_on(
        &self,
        mut channel: C,
        items: &[WorkItem],
    ) -> std::result::Result<CoordinatorOutcome, WorkerError> {
        // Slot ids must match positions before anything is spawned
        if let Some((slot, item)) = items
            .iter()
            .enumerate()
            .find(|(pos, item)| item.slot_id != *pos)
        {
            return Err(WorkerError::SlotMismatch {
                slot,
                found: item.slot_id,
            });
        }

        let started = Instant::now();

        let mut handles = Vec::with_capacity(items.len());
        let mut spawn_error = None;

        for item in items {
            match channel.spawn(item) {
                Ok(handle) => {
                    match handle.spawned_as() {
                        Some(id) => info!(
                            slot = item.slot_id,
                            worker = %id,
                            start = item.range_start,
                            end = item.range_end,
                            "Worker spawned"
                        ),
                        None => info!(
                            slot = item.slot_id,
                            start = item.range_start,
                            end = item.range_end,
                            "Worker spawned"
                        ),
                    }
                    handles.push(handle);
                }
                Err(e) => {
                    error!(slot = item.slot_id, error = %e, "Worker spawn failed");
                    spawn_error = Some(e);
                    break;
                }
            }
        }

        let spawned = handles.len();
        let mut join_error = None;

        for handle in handles {
            let slot = handle.slot();
            if let Err(e) = channel.join(handle) {
                warn!(slot = slot, error = %e, "Worker failed");
                join_error.get_or_insert(e);
            }
        }

        let overall = started.elapsed();
        debug!(joined = spawned, "All workers joined");

        if let Some(e) = spawn_error {
            return Err(e);
        }
        if let Some(e) = join_error {
            return Err(e);
        }

        let table = channel.into_table()?;

        Ok(CoordinatorOutcome { table, overall })
    }
}

/// Run `items` under the given isolation mode
pub fn run_with_mode(
    mode: IsolationMode,
    predicate: Predicate,
    items: &[WorkItem],
) -> std::result::Result<CoordinatorOutcome, WorkerError> {
    match mode {
        IsolationMode::Thread => Coordinator::<ThreadChannel>::new(predicate).run_all(items),
        #[cfg(unix)]
        IsolationMode::Process => Coordinator::<ProcessChannel>::new(predicate).run_all(items),
        #[cfg(not(unix))]
        IsolationMode::Process => Err(WorkerError::ChannelInit {
            slots: items.len(),
            reason: "process isolation requires a unix platform".to_string(),
        }),
    }
}

/// Result of a completed scan run
#[derive(Debug)]
pub struct ScanResult {
    /// Isolation model the workers ran under
    pub mode: IsolationMode,

    /// Work items in slot order
    pub items: Vec<WorkItem>,

    /// Completed result table
    pub table: ResultTable,

    /// Parent-observed wall time in milliseconds
    pub overall_millis: i64,
}

impl ScanResult {
    /// Build the report view over this result
    pub fn report(&self) -> Report<'_> {
        aggregate(&self.table, self.mode, self.overall_millis)
    }

    /// Total number of matches across all workers
    pub fn match_count(&self) -> usize {
        self.table.iter().map(|r| r.matches.len()).sum()
    }
}

/// Partitions the configured range and runs it to completion
pub struct ScanCoordinator {
    config: ScanConfig,
}

impl ScanCoordinator {
    /// Create a coordinator for a validated configuration
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Run the scan
    pub fn run(&self) -> Result<ScanResult> {
        let items = partition(self.config.upper_bound, self.config.worker_count)?;

        info!(
            workers = items.len(),
            upper_bound = self.config.upper_bound,
            isolation = %self.config.isolation,
            "Starting scan"
        );

        let outcome = run_with_mode(self.config.isolation, is_narcissistic, &items)?;
        let overall_millis = outcome.overall_millis();

        info!(overall_ms = overall_millis, "Scan completed");

        Ok(ScanResult {
            mode: self.config.isolation,
            items,
            table: outcome.table,
            overall_millis,
        })
    }
}
