//! Run reporting.
//!
//! ## TestReporter Trait
//!
//! The driver talks to a `TestReporter` instead of printing directly. Failures are reported once, all
//! together, after every worker has finished; nothing is interleaved with execution.
//!
//! Two implementations ship:
//! - [`ConsoleReporter`]: the human-readable summary, optionally coloured.
//! - [`JsonReporter`]: one JSON document for CI tooling.

use std::io::{self, Write};
use std::time::Duration;

use serde_json::json;

use crate::harness::error::HarnessError;
use crate::harness::task_runner::FailureKind;

/// A failed test, resolved back to its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    pub name: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub test_count: usize,
    pub error_count: usize,
    pub has_unknown_error: bool,
    pub elapsed: Duration,
    pub slowest: Option<(String, Duration)>,
    pub failures: Vec<FailureDetail>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        !self.has_unknown_error && self.error_count == 0
    }
}

/// Trait for reporting run results.
///
/// Implement this trait to customize the output format.
pub trait TestReporter {
    /// Called once the tests are prepared, before any of them runs
    fn on_run_start(&mut self, _test_count: usize, _mode_description: &str) {}

    /// Called when the run could not be completed
    fn on_abnormal_exit(&mut self, error: &HarnessError);

    /// Called after every test has been accounted for
    fn on_run_complete(&mut self, summary: &RunSummary);
}

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Default console reporter
pub struct ConsoleReporter {
    out: Box<dyn Write>,
    color: bool,
    abnormal: bool,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(Box::new(io::stdout()), true)
    }
}

impl ConsoleReporter {
    pub fn new(out: Box<dyn Write>, color: bool) -> Self {
        Self {
            out,
            color,
            abnormal: false,
        }
    }

    fn paint(&self, color: &'static str) -> &'static str {
        if self.color { color } else { "" }
    }

    fn reset(&self) -> &'static str {
        self.paint(RESET)
    }

    fn write_failures(&mut self, summary: &RunSummary) -> io::Result<()> {
        let (red, reset) = (self.paint(RED), self.reset());

        write!(self.out, "{red}\n{} test errors have occurred.\n\n", summary.failures.len())?;
        for (index, failure) in summary.failures.iter().enumerate() {
            write!(
                self.out,
                "{index}. '{}' has an error:\n{}\n\n",
                failure.name, failure.message
            )?;
        }
        write!(self.out, "{reset}")
    }

    fn write_summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        if !summary.failures.is_empty() {
            self.write_failures(summary)?;
        }

        if summary.is_success() {
            let (green, reset) = (self.paint(GREEN), self.reset());
            writeln!(self.out, "{green}All {} tests are successful.{reset}", summary.test_count)?;
        } else {
            let (red, reset) = (self.paint(RED), self.reset());
            writeln!(
                self.out,
                "{red}{} errors in {} tests.{reset}",
                summary.error_count, summary.test_count
            )?;
            if summary.has_unknown_error {
                writeln!(self.out, "{red}At least one unknown error has occurred!{reset}")?;
            }
        }

        writeln!(self.out, " Elapsed time {} nanoseconds.", summary.elapsed.as_nanos())?;
        self.out.flush()
    }
}

impl TestReporter for ConsoleReporter {
    fn on_abnormal_exit(&mut self, error: &HarnessError) {
        self.abnormal = true;
        let (red, reset) = (self.paint(RED), self.reset());
        // Reporting is best effort: a closed stdout must not turn into a second failure.
        let _ = writeln!(self.out, "{red}Exit the tests run abnormally. Error: {error}{reset}");
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        if let Err(err) = self.write_summary(summary) {
            tracing::warn!(error = %err, abnormal = self.abnormal, "failed to write test report");
        }
    }
}

/// Machine-readable reporter: a single JSON object per run.
pub struct JsonReporter {
    out: Box<dyn Write>,
    abnormal: Option<String>,
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new(Box::new(io::stdout()))
    }
}

impl JsonReporter {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out, abnormal: None }
    }

    /// The JSON document for a summary.
    pub fn to_value(summary: &RunSummary, abnormal: Option<&str>) -> serde_json::Value {
        let failures: Vec<serde_json::Value> = summary
            .failures
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "kind": kind_str(f.kind),
                    "message": f.message,
                })
            })
            .collect();

        json!({
            "test_count": summary.test_count,
            "error_count": summary.error_count,
            "has_unknown_error": summary.has_unknown_error,
            "elapsed_ns": summary.elapsed.as_nanos() as u64,
            "slowest": summary.slowest.as_ref().map(|(name, d)| json!({
                "name": name,
                "elapsed_ns": d.as_nanos() as u64,
            })),
            "abnormal_exit": abnormal,
            "failures": failures,
        })
    }
}

fn kind_str(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Test => "test",
        FailureKind::Infrastructure => "infrastructure",
        FailureKind::Cancelled => "cancelled",
    }
}

impl TestReporter for JsonReporter {
    fn on_abnormal_exit(&mut self, error: &HarnessError) {
        self.abnormal = Some(error.to_string());
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let value = Self::to_value(summary, self.abnormal.as_deref());
        let written = serde_json::to_writer_pretty(&mut self.out, &value)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(self.out));
        if let Err(err) = written {
            tracing::warn!(error = %err, "failed to write JSON report");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_report_shape() {
        let summary = RunSummary {
            test_count: 3,
            error_count: 1,
            has_unknown_error: false,
            elapsed: Duration::from_nanos(1500),
            slowest: Some(("slow".to_string(), Duration::from_nanos(900))),
            failures: vec![FailureDetail {
                name: "b".to_string(),
                kind: FailureKind::Test,
                message: "bad input".to_string(),
            }],
        };

        let value = JsonReporter::to_value(&summary, None);
        assert_eq!(value["test_count"], 3);
        assert_eq!(value["failures"][0]["kind"], "test");
        assert_eq!(value["slowest"]["elapsed_ns"], 900);
        assert!(value["abnormal_exit"].is_null());
    }

    #[test]
    fn test_summary_success() {
        let mut summary = RunSummary::default();
        assert!(summary.is_success());
        summary.has_unknown_error = true;
        assert!(!summary.is_success());
    }
}
