//! Configuration types for narc-scan
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Isolation mode selection
//! - Runtime configuration with validation

use crate::error::{ConfigError, ConfigResult};
use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Maximum reasonable worker count
pub const MAX_WORKERS: usize = 4096;

/// Parallel narcissistic number scanner
#[derive(Parser, Debug, Clone)]
#[command(
    name = "narc-scan",
    version,
    about = "Parallel narcissistic number scanner",
    long_about = "Splits [1, UPPER_BOUND] into one contiguous sub-range per worker, scans each \
                  sub-range for narcissistic numbers in parallel and writes a per-worker report.\n\n\
                  Workers run either as forked child processes publishing into a shared memory \
                  table, or as threads publishing into a mutex-guarded table.",
    after_help = "EXAMPLES:\n    \
        narc-scan -n 4 -c 1000000 -f report.txt\n    \
        narc-scan -n 8 -c 100000000 -f report.txt --isolation process\n    \
        narc-scan -n 2 -c 1000 -f report.txt -q"
)]
pub struct CliArgs {
    /// Number of workers
    #[arg(short = 'n', long = "workers", value_name = "NUM")]
    pub workers: usize,

    /// Upper bound of the scanned range [1, UPPER_BOUND]
    #[arg(short = 'c', long = "count", value_name = "UPPER_BOUND")]
    pub upper_bound: u64,

    /// Report file to write
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub output: PathBuf,

    /// How workers are isolated from each other
    #[arg(long, value_enum, default_value_t = IsolationMode::Thread)]
    pub isolation: IsolationMode,

    /// Quiet mode - suppress console header and summary
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Worker isolation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IsolationMode {
    /// Forked child processes, shared memory result table, no lock
    Process,
    /// Threads in one address space, mutex-guarded result table
    Thread,
}

impl IsolationMode {
    /// Whether this mode can run on the current platform
    pub fn is_supported(self) -> bool {
        match self {
            IsolationMode::Process => cfg!(unix),
            IsolationMode::Thread => true,
        }
    }

    /// Header label for the identity column
    pub fn identity_label(self) -> &'static str {
        match self {
            IsolationMode::Process => "PID",
            IsolationMode::Thread => "TID",
        }
    }

    /// Noun used for workers in the report trailer
    pub fn worker_noun(self) -> &'static str {
        match self {
            IsolationMode::Process => "child processes",
            IsolationMode::Thread => "spawned threads",
        }
    }
}

impl fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationMode::Process => f.write_str("process"),
            IsolationMode::Thread => f.write_str("thread"),
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of workers
    pub worker_count: usize,

    /// Inclusive upper bound of the scanned range
    pub upper_bound: u64,

    /// Report file path
    pub output_path: PathBuf,

    /// Worker isolation model
    pub isolation: IsolationMode,

    /// Show console header, spinner and summary
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl ScanConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> ConfigResult<Self> {
        validate_counts(args.upper_bound, args.workers)?;

        if !args.isolation.is_supported() {
            return Err(ConfigError::UnsupportedIsolation(args.isolation.to_string()));
        }

        if args.output.as_os_str().is_empty() {
            return Err(ConfigError::InvalidOutputPath {
                path: args.output,
                reason: "Output path is empty".to_string(),
            });
        }

        if let Some(parent) = args.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::InvalidOutputPath {
                    path: args.output.clone(),
                    reason: format!("Parent directory '{}' does not exist", parent.display()),
                });
            }
        }

        let cpus = num_cpus::get();
        if args.workers > cpus {
            warn!(
                workers = args.workers,
                cpus = cpus,
                "More workers than CPUs; workers will time-share cores"
            );
        }

        Ok(Self {
            worker_count: args.workers,
            upper_bound: args.upper_bound,
            output_path: args.output,
            isolation: args.isolation,
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }
}

/// Check that `upper_bound` numbers can be split across `workers` non-empty ranges
pub fn validate_counts(upper_bound: u64, workers: usize) -> ConfigResult<()> {
    if workers == 0 || workers > MAX_WORKERS {
        return Err(ConfigError::InvalidWorkerCount {
            count: workers,
            max: MAX_WORKERS,
        });
    }

    if upper_bound == 0 {
        return Err(ConfigError::InvalidUpperBound(upper_bound));
    }

    if upper_bound < workers as u64 {
        return Err(ConfigError::RangeTooSmall {
            total: upper_bound,
            workers,
        });
    }

    Ok(())
}
