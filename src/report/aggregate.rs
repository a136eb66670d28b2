//! Aggregation of a completed result table into a report view

use crate::config::IsolationMode;
use crate::scan::table::ResultTable;
use crate::scan::worker::WorkerIdentity;

/// One report line, borrowed from the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRow<'a> {
    /// Process or thread that ran the slot
    pub identity: WorkerIdentity,

    /// Worker scan time in milliseconds
    pub elapsed_millis: i64,

    /// First scanned number
    pub range_start: u64,

    /// Last scanned number
    pub range_end: u64,

    /// Matches, ascending
    pub matches: &'a [u64],
}

/// Report over one completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report<'a> {
    /// Isolation model, selects column and trailer labels
    pub mode: IsolationMode,

    /// Rows in slot order
    pub rows: Vec<ReportRow<'a>>,

    /// Parent-observed wall time
    pub overall_millis: i64,

    /// Sum of every worker's own elapsed time
    ///
    /// Diagnostic only; exceeds `overall_millis` when workers truly overlap.
    pub sum_worker_millis: i64,
}

impl Report<'_> {
    /// Every match across all rows, in row order
    pub fn all_matches(&self) -> Vec<u64> {
        self.rows
            .iter()
            .flat_map(|row| row.matches.iter().copied())
            .collect()
    }
}

/// Build the report view; the table is only read
pub fn aggregate(table: &ResultTable, mode: IsolationMode, overall_millis: i64) -> Report<'_> {
    let rows: Vec<ReportRow<'_>> = table
        .iter()
        .map(|r| ReportRow {
            identity: r.identity,
            elapsed_millis: r.elapsed_millis,
            range_start: r.range_start,
            range_end: r.range_end,
            matches: &r.matches,
        })
        .collect();

    let sum_worker_millis = rows.iter().map(|row| row.elapsed_millis).sum();

    Report {
        mode,
        rows,
        overall_millis,
        sum_worker_millis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::worker::WorkerResult;

    fn table() -> ResultTable {
        let slots = [(0, 1, 3, 12, vec![1, 2, 3]), (1, 4, 6, 7, vec![4, 5, 6]), (2, 7, 10, 30, vec![7, 8, 9])]
            .into_iter()
            .map(|(slot_id, range_start, range_end, elapsed_millis, matches)| {
                Some(WorkerResult {
                    identity: WorkerIdentity::Pid(1000 + slot_id as i32),
                    slot_id,
                    range_start,
                    range_end,
                    elapsed_millis,
                    matches,
                })
            })
            .collect();
        ResultTable::from_slots(slots).unwrap()
    }

    #[test]
    fn test_sum_independent_of_overall() {
        let table = table();
        let report = aggregate(&table, IsolationMode::Process, 5);
        assert_eq!(report.sum_worker_millis, 49);
        assert_eq!(report.overall_millis, 5);

        let again = aggregate(&table, IsolationMode::Process, 500);
        assert_eq!(again.sum_worker_millis, 49);
    }

    #[test]
    fn test_rows_in_slot_order() {
        let table = table();
        let report = aggregate(&table, IsolationMode::Process, 0);
        let ids: Vec<_> = report.rows.iter().map(|r| r.identity).collect();
        assert_eq!(
            ids,
            vec![
                WorkerIdentity::Pid(1000),
                WorkerIdentity::Pid(1001),
                WorkerIdentity::Pid(1002)
            ]
        );
        assert_eq!((report.rows[2].range_start, report.rows[2].range_end), (7, 10));
        assert_eq!(report.all_matches(), (1..=9).collect::<Vec<u64>>());
    }

    #[test]
    fn test_aggregate_does_not_mutate_table() {
        let table = table();
        let before = table.clone();
        let _ = aggregate(&table, IsolationMode::Thread, 1);
        assert_eq!(table, before);
    }
}
