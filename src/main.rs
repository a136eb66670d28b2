//! narc-scan - Parallel Narcissistic Number Scanner
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use narc_scan::config::{CliArgs, ScanConfig};
use narc_scan::progress::{print_header, print_summary, ProgressReporter};
use narc_scan::report::{FileSink, ReportSink};
use narc_scan::scan::ScanCoordinator;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Usage errors exit 1 like every other failure; help and version exit 0
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<()> {
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = ScanConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress {
        print_header(&config);
    }

    let mut sink = FileSink::new(&config.output_path);

    let progress = config
        .show_progress
        .then(|| ProgressReporter::for_mode(config.isolation));
    if let Some(ref p) = progress {
        p.set_status(&format!("Scanning with {} workers...", config.worker_count));
    }

    let result = ScanCoordinator::new(config.clone()).run();

    if let Some(ref p) = progress {
        match &result {
            Ok(_) => p.finish("Scan completed"),
            Err(_) => p.finish_and_clear(),
        }
    }

    let result = result.context("Scan failed")?;
    let report = result.report();

    sink.write_report(&report)
        .context("Failed to write report")?;

    info!(
        path = %config.output_path.display(),
        rows = report.rows.len(),
        "Report written"
    );

    if config.show_progress {
        print_summary(
            result.match_count(),
            report.overall_millis,
            report.sum_worker_millis,
            &config.output_path.display().to_string(),
        );
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("narc_scan=debug,warn")
    } else {
        EnvFilter::new("narc_scan=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
