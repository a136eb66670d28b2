//! Parallel range scan
//!
//! This module implements the static partition / spawn / join pipeline.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │     ScanCoordinator     │
//!                     │  - partition [1, N]     │
//!                     │  - spawn, join, time    │
//!                     └───────────┬─────────────┘
//!                                 │
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Worker 0 │             │  Worker 1 │             │  Worker N │
//! │ [1, p]    │             │ [p+1, 2p] │             │ [.., N]   │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       │ publish slot 0          │ publish slot 1          │ publish slot N
//!       └─────────────────────────┼─────────────────────────┘
//!                                 ▼
//!                     ┌─────────────────────────┐
//!                     │      ResultChannel      │
//!                     │  shared mmap (process)  │
//!                     │  or Mutex (thread)      │
//!                     └─────────────────────────┘
//! ```

pub mod channel;
pub mod coordinator;
pub mod partition;
pub mod predicate;
pub mod table;
pub mod worker;

pub use channel::{ResultChannel, SharedTable, ThreadChannel, WorkerHandle};
#[cfg(unix)]
pub use channel::ProcessChannel;
pub use coordinator::{run_with_mode, Coordinator, CoordinatorOutcome, ScanCoordinator, ScanResult};
pub use partition::{partition, WorkItem};
pub use predicate::{is_narcissistic, Predicate};
pub use table::ResultTable;
pub use worker::{ScanOutput, WorkerIdentity, WorkerResult};
