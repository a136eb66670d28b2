//! narc-scan - Parallel Narcissistic Number Scanner
//!
//! Splits the range `[1, N]` into one contiguous sub-range per worker, scans
//! every sub-range in parallel for narcissistic (Armstrong) numbers, and
//! writes a per-worker report with each worker's identity, elapsed time,
//! range and matches.
//!
//! # Features
//!
//! - **Static Partitioning**: Every worker gets `N / workers` numbers; the
//!   last worker also takes the remainder.
//!
//! - **Two Isolation Models**: Forked child processes publishing into a
//!   shared memory table without locks, or threads publishing into a
//!   mutex-guarded table. Both run through the same coordinator.
//!
//! - **Slot-Ordered Reports**: Rows always follow partition order, whatever
//!   order workers actually finish in.
//!
//! # Architecture
//!
//! ```text
//!   CLI (-n, -c, -f)
//!        │
//!        ▼
//!   ┌──────────────┐   WorkItem per slot   ┌──────────────────────────┐
//!   │  partition   │──────────────────────▶│      Coordinator<C>      │
//!   └──────────────┘                       │ open → spawn* → join*    │
//!                                          └────────────┬─────────────┘
//!                                                       │
//!                        ┌──────────────────────────────┼──────────────┐
//!                        ▼                              ▼              ▼
//!                   ┌─────────┐                    ┌─────────┐    ┌─────────┐
//!                   │Worker 0 │                    │Worker 1 │    │Worker N │
//!                   └────┬────┘                    └────┬────┘    └────┬────┘
//!                        └──────────── publish own slot ┴──────────────┘
//!                                                       │
//!                                                       ▼
//!                                          ┌──────────────────────────┐
//!                                          │ ResultTable → aggregate  │
//!                                          │ → Report → FileSink      │
//!                                          └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Four threads over [1, 1000000]
//! narc-scan -n 4 -c 1000000 -f report.txt
//!
//! # Eight forked processes
//! narc-scan -n 8 -c 100000000 -f report.txt --isolation process
//! ```

pub mod config;
pub mod error;
pub mod progress;
pub mod report;
pub mod scan;

pub use config::{CliArgs, IsolationMode, ScanConfig};
pub use error::{Result, ScanError};
pub use report::{aggregate, FileSink, Report, ReportSink};
pub use scan::{partition, ResultTable, ScanCoordinator, ScanResult, WorkItem};
