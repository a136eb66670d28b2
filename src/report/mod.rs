//! Scan report
//!
//! A [`Report`] is a read-only view over a completed
//! [`ResultTable`](crate::scan::ResultTable): one row per slot in slot order,
//! plus the parent-observed wall time and the sum of per-worker times.
//!
//! The text layout written by [`render`] is:
//!
//! ```text
//! PID,	Time (ms),	From,	To,	Narcissistic Numbers
//! 4121,	3,	1,	250,	1 2 3 4 5 6 7 8 9 153
//! 4122,	0,	251,	500,	370 371 407
//!
//! Parent process time: 5 ms
//! Sum time of the child processes: 3 ms
//! ```

pub mod aggregate;
pub mod sink;

pub use aggregate::{aggregate, Report, ReportRow};
pub use sink::{render, FileSink, ReportSink};
