//! CLI module for the difftest harness
//!
//! This module provides the command-line interface: argument parsing, exit codes, and the run entry point.
//!
//! ## Modules
//!
//! - `test_interfaces` - Harness error type and the traits the runner is built on
//! - `test_runner` - Classification, aggregation and reporting
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.
//!
//! ## Exit codes
//!
//! - `0`: no test failed (skips allowed)
//! - `1`: at least one test failed
//! - `2`: the run was aborted (bad test directory, build tool unavailable or timed out)

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod test_interfaces;
pub mod test_runner;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use crate::config::{HarnessConfig, Mode, OutputFormat};
use crate::version::DIFFTEST_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The run was aborted before a verdict could be reached for every test.
    pub const ERROR: ExitCode = ExitCode(2);
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
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Differential test harness for a C compiler
#[derive(Parser, Debug)]
#[command(name = "difftest")]
#[command(version = DIFFTEST_VERSION)]
#[command(about = "Build a directory of C tests with the compiler under test and check their output", long_about = None)]
pub struct Cli {
    /// Test directory (sources, golden files, Makefile)
    #[arg(short = 'd', long = "test-dir", value_name = "DIR")]
    pub test_dir: PathBuf,

    /// Where expected output comes from
    #[arg(short, long, value_enum, default_value_t = Mode::Golden)]
    pub mode: Mode,

    /// Source file extension
    #[arg(long = "ext", value_name = "EXT", default_value = "c")]
    pub extension: String,

    /// Build tool run as `<tool> clean` and `<tool>` in the test directory
    #[arg(long = "build-tool", value_name = "PROG", default_value = "make")]
    pub build_tool: String,

    /// Reference compiler (differential mode)
    #[arg(long = "reference-cc", value_name = "PROG", default_value = "clang")]
    pub reference_cc: String,

    /// Extra argument for the reference compiler (repeatable)
    #[arg(long = "reference-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub reference_args: Vec<String>,

    /// Timeout for each test binary and reference compile, in seconds
    #[arg(long, value_name = "SECS", default_value = "5", value_parser = parse_secs)]
    pub timeout: Duration,

    /// Timeout for each build and clean step, in seconds
    #[arg(long = "build-timeout", value_name = "SECS", default_value = "300", value_parser = parse_secs)]
    pub build_timeout: Duration,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
    pub format: OutputFormat,

    /// Only run tests whose name contains EXPR
    #[arg(short = 'k', value_name = "EXPR")]
    pub filter: Option<String>,

    /// Stop on first failure
    #[arg(short = 'x', long = "exitfirst")]
    pub stop_on_fail: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Cli {
    /// Build the harness configuration from parsed arguments.
    pub fn into_config(self) -> HarnessConfig {
        let color = test_runner::use_color(self.no_color);
        HarnessConfig {
            test_dir: self.test_dir,
            mode: self.mode,
            source_extension: self.extension,
            build_tool: self.build_tool,
            reference_compiler: self.reference_cc,
            reference_args: self.reference_args,
            run_timeout: self.timeout,
            build_timeout: self.build_timeout,
            stop_on_fail: self.stop_on_fail,
            filter: self.filter,
            verbose: self.verbose,
            color,
            format: self.format,
            ..HarnessConfig::default()
        }
    }
}

/// Parse a positive number of seconds (fractions allowed).
fn parse_secs(value: &str) -> Result<Duration, String> {
    let secs: f64 = value.parse().map_err(|_| format!("'{value}' is not a number of seconds"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be a positive number of seconds, got '{value}'"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
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

    match execute(cli) {
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

/// Execute the parsed command line and return the exit code.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.into_config();
    tracing::debug!(?config, "starting run");
    test_runner::run_tests(&config)
}

// ============================================================================
// Tests
// ============================================================================
