//! Static range partitioning
//!
//! `[1, total]` is split into one contiguous sub-range per worker. Every
//! worker gets `total / workers` numbers except the last, which also takes
//! the remainder.

use crate::config::validate_counts;
use crate::error::ConfigResult;

/// One worker's share of the range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    /// Position in the result table
    pub slot_id: usize,

    /// First number to scan (inclusive)
    pub range_start: u64,

    /// Last number to scan (inclusive)
    pub range_end: u64,
}

impl WorkItem {
    /// Number of integers in this item's range
    pub fn len(&self) -> u64 {
        self.range_end - self.range_start + 1
    }

    /// Always false: partitions never produce empty ranges
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Split `[1, total]` into `workers` contiguous, non-overlapping ranges
///
/// Fails if `workers` is zero or larger than `total`.
pub fn partition(total: u64, workers: usize) -> ConfigResult<Vec<WorkItem>> {
    validate_counts(total, workers)?;

    let n = workers as u64;
    let chunk = total / n;

    let items = (0..workers)
        .map(|slot_id| {
            let i = slot_id as u64;
            let range_start = 1 + i * chunk;
            let range_end = if i + 1 == n {
                total
            } else {
                range_start + chunk - 1
            };
            WorkItem {
                slot_id,
                range_start,
                range_end,
            }
        })
        .collect();

    Ok(items)
}
