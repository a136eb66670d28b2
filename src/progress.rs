//! Console output for a scan run
//!
//! Provides a spinner while workers run, plus a header and summary using
//! `console` styling.

use crate::config::{IsolationMode, ScanConfig};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while the coordinator waits on its workers
pub struct ProgressReporter {
    bar: ProgressBar,
    ticking: bool,
}

impl ProgressReporter {
    /// Create and start a spinner that redraws from a background thread
    pub fn new() -> Self {
        let mut reporter = Self::without_ticker();
        reporter.bar.enable_steady_tick(Duration::from_millis(100));
        reporter.ticking = true;
        reporter
    }

    /// Create a spinner that only redraws when its message changes
    ///
    /// Used when workers are forked, since fork must not race a ticker thread.
    fn without_ticker() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        Self { bar, ticking: false }
    }

    /// Spinner suited to the isolation mode workers run under
    pub fn for_mode(mode: IsolationMode) -> Self {
        match mode {
            IsolationMode::Process => Self::without_ticker(),
            IsolationMode::Thread => Self::new(),
        }
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the spinner with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the spinner
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print the resolved run parameters
pub fn print_header(config: &ScanConfig) {
    println!();
    println!(
        "{} {}",
        style("narc-scan").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} [1, {}]",
        style("Range:").bold(),
        format_number(config.upper_bound)
    );
    println!("  {} {}", style("Workers:").bold(), config.worker_count);
    println!("  {} {}", style("Isolation:").bold(), config.isolation);
    println!(
        "  {} {}",
        style("Output:").bold(),
        config.output_path.display()
    );
    println!();
}

/// Print a summary of the finished scan
pub fn print_summary(
    matches: usize,
    overall_millis: i64,
    sum_worker_millis: i64,
    report_path: &str,
) {
    println!();
    println!("{}", style("Scan Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Matches:").bold(),
        format_number(matches as u64)
    );
    println!("  {} {} ms", style("Wall time:").bold(), overall_millis);
    println!(
        "  {} {} ms",
        style("Worker time (sum):").bold(),
        sum_worker_millis
    );
    println!("  {} {}", style("Report:").bold(), report_path);
    println!();
}
