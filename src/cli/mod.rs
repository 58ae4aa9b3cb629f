//! CLI module for the test harness
//!
//! This module provides the command-line interface that runs the built-in suite.
//!
//! ## Modules
//!
//! - `test_runner` - `run_all_tests` driver
//! - `report` - console and JSON reporters
//! - `selftest` - the registry the binary runs
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod report;
pub mod selftest;
pub mod test_runner;

use std::fmt;
use std::panic;
use std::process;

use clap::{Parser, ValueEnum};

use crate::harness::outcome;
use crate::harness::{HarnessConfig, RunMode, TestRegistry};
use report::{ConsoleReporter, JsonReporter, TestReporter};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Render a diagnostic (code, help) into a failure.
    pub fn diagnostic(err: impl miette::Diagnostic + Send + Sync + 'static) -> Self {
        Self::failure(format!("{:?}", miette::Report::new(err)))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Output format of the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Console,
    Json,
}

/// Parallel test runner
#[derive(Parser, Debug)]
#[command(name = "testrun")]
#[command(version = VERSION)]
#[command(about = "Run the registered test suite on a pull-based thread pool", long_about = None)]
pub struct Cli {
    /// Run one test at a time, in registration order (use under a debugger)
    #[arg(long, conflicts_with = "jobs")]
    pub sequential: bool,

    /// Maximum number of worker threads (0 = all cores, 1 = sequential)
    #[arg(short = 'j', long = "jobs", value_name = "N", default_value_t = 0)]
    pub jobs: usize,

    /// Only run tests whose name contains EXPR
    #[arg(short = 'k', value_name = "EXPR")]
    pub filter: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    pub format: ReportFormat,

    /// Disable ANSI colours in the console report
    #[arg(long)]
    pub no_color: bool,

    /// Exit with status 1 when any test fails
    #[arg(long)]
    pub strict: bool,

    /// List the tests in run order and exit
    #[arg(long)]
    pub list: bool,
}

impl Cli {
    /// Build the harness configuration from the parsed flags.
    pub fn config(&self) -> HarnessConfig {
        let mode = if self.sequential {
            RunMode::Sequential
        } else {
            RunMode::from_jobs(self.jobs)
        };

        let mut config = HarnessConfig::new().with_mode(mode).with_strict_exit(self.strict);
        if let Some(filter) = &self.filter {
            config = config.with_filter(filter.clone());
        }
        config
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();
    install_quiet_panic_hook();

    match execute(cli, selftest::registry()) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI against a registry and return the exit code.
pub fn execute(cli: Cli, registry: TestRegistry) -> CliResult<ExitCode> {
    let config = cli.config();

    if cli.list {
        return list_tests(registry, &config);
    }

    let mut reporter: Box<dyn TestReporter> = match cli.format {
        ReportFormat::Console => Box::new(ConsoleReporter::new(Box::new(std::io::stdout()), !cli.no_color)),
        ReportFormat::Json => Box::new(JsonReporter::default()),
    };

    Ok(test_runner::run_all_tests(registry, &config, reporter.as_mut()))
}

fn list_tests(registry: TestRegistry, config: &HarnessConfig) -> CliResult<ExitCode> {
    let registry = match config.filter.as_deref() {
        Some(keyword) => registry.filtered(keyword),
        None => registry,
    };
    let tests = registry.prepared(config.mode).map_err(CliError::diagnostic)?;

    for test in &tests {
        println!("{}", test.name);
    }
    println!("{} test(s)", tests.len());
    Ok(ExitCode::SUCCESS)
}

/// Route panic messages from failing tests to the log instead of stderr.
///
/// The messages still reach the report through the captured failure text. A panic outside any test
/// body is a harness bug: it is logged at `warn` and handed to the previous hook.
fn install_quiet_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if outcome::is_inside_catch() {
            tracing::debug!(panic = %info, "test panicked");
        } else {
            tracing::warn!(panic = %info, "harness panicked outside a test");
            previous(info);
        }
    }));
}

// ============================================================================
// Tests
// ============================================================================
