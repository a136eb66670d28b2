//! Report output
//!
//! The report is written once, at the end of a successful run. Column order
//! is identity, time, start, end, matches.

use crate::error::{SinkError, SinkResult};
use crate::report::Report;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

/// Destination for a finished report
pub trait ReportSink {
    /// Write the whole report
    fn write_report(&mut self, report: &Report<'_>) -> SinkResult<()>;
}

/// Write the report text to any writer
pub fn render<W: Write>(report: &Report<'_>, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "{},\tTime (ms),\tFrom,\tTo,\tNarcissistic Numbers",
        report.mode.identity_label()
    )?;

    for row in &report.rows {
        write!(
            out,
            "{},\t{},\t{},\t{},\t",
            row.identity, row.elapsed_millis, row.range_start, row.range_end
        )?;
        for (i, m) in row.matches.iter().enumerate() {
            if i > 0 {
                out.write_all(b" ")?;
            }
            write!(out, "{}", m)?;
        }
        out.write_all(b"\n")?;
    }

    writeln!(out)?;
    writeln!(out, "Parent process time: {} ms", report.overall_millis)?;
    writeln!(
        out,
        "Sum time of the {}: {} ms",
        report.mode.worker_noun(),
        report.sum_worker_millis
    )?;

    Ok(())
}

/// Writes the report to a file, truncating any previous content
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Sink targeting `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for FileSink {
    fn write_report(&mut self, report: &Report<'_>) -> SinkResult<()> {
        let file = File::create(&self.path).map_err(|source| SinkError::Open {
            path: self.path.clone(),
            source,
        })?;

        let mut out = BufWriter::new(file);
        render(report, &mut out)
            .and_then(|()| out.flush())
            .map_err(|source| SinkError::Write {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), rows = report.rows.len(), "Report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IsolationMode;
    use crate::report::ReportRow;
    use crate::scan::worker::WorkerIdentity;
    use tempfile::tempdir;

    fn report(mode: IsolationMode) -> Report<'static> {
        static FIRST: [u64; 3] = [1, 2, 3];
        Report {
            mode,
            rows: vec![
                ReportRow {
                    identity: WorkerIdentity::Pid(41),
                    elapsed_millis: 2,
                    range_start: 1,
                    range_end: 3,
                    matches: &FIRST,
                },
                ReportRow {
                    identity: WorkerIdentity::Pid(42),
                    elapsed_millis: 1,
                    range_start: 4,
                    range_end: 5,
                    matches: &[],
                },
            ],
            overall_millis: 4,
            sum_worker_millis: 3,
        }
    }

    #[test]
    fn test_render_process_layout() {
        let mut out = Vec::new();
        render(&report(IsolationMode::Process), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "PID,\tTime (ms),\tFrom,\tTo,\tNarcissistic Numbers\n\
             41,\t2,\t1,\t3,\t1 2 3\n\
             42,\t1,\t4,\t5,\t\n\
             \n\
             Parent process time: 4 ms\n\
             Sum time of the child processes: 3 ms\n"
        );
    }

    #[test]
    fn test_render_thread_labels() {
        let mut out = Vec::new();
        render(&report(IsolationMode::Thread), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("TID,\t"));
        assert!(text.ends_with("Sum time of the spawned threads: 3 ms\n"));
    }

    #[test]
    fn test_file_sink_writes_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");

        let mut sink = FileSink::new(&path);
        sink.write_report(&report(IsolationMode::Process)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 6);
        assert!(text.contains("41,\t2,\t1,\t3,\t1 2 3"));
    }

    #[test]
    fn test_file_sink_open_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("report.txt");

        let err = FileSink::new(&path)
            .write_report(&report(IsolationMode::Process))
            .unwrap_err();
        assert!(matches!(err, SinkError::Open { .. }));
    }
}
