//! Test runner I/O boundary interfaces
//!
//! This module defines trait-based abstractions for the harness operations that touch the outside world:
//! - Test discovery (directory listing)
//! - Build orchestration (clean + build over the test directory)
//! - Reference compilation (one source file with the reference toolchain)
//! - Test execution (run one binary, capture its output)
//! - Expected output (golden file or reference binary)
//!
//! The classifier in `test_runner.rs` only talks to these traits, so its state machine can be driven
//! by in-memory fakes in tests.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use difftest_core::TestId;
use miette::Diagnostic;
use thiserror::Error;

use crate::build::CompileStatus;
use crate::compare::Expectation;
use crate::exec::RunOutcome;

/// Errors that abort the whole run.
///
/// Everything that can go wrong for a single test is a `Verdict` instead.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("test directory '{}' does not exist", .0.display())]
    #[diagnostic(code(difftest::catalog::not_found), help("pass an existing directory with -d/--test-dir"))]
    DirectoryNotFound(PathBuf),

    #[error("cannot list test directory '{}'", .path.display())]
    #[diagnostic(code(difftest::catalog::unreadable))]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("test '{id}' is defined by more than one source file: {first} and {second}")]
    #[diagnostic(
        code(difftest::catalog::duplicate),
        help("test names are source file names without the extension and must be unique")
    )]
    DuplicateTest { id: TestId, first: String, second: String },

    #[error("could not start build tool '{tool}'")]
    #[diagnostic(code(difftest::build::unavailable), help("install the build tool or pass --build-tool"))]
    BuildToolUnavailable {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("build step '{step}' timed out after {}s", .timeout.as_secs_f64())]
    #[diagnostic(code(difftest::build::timeout), help("raise the limit with --build-timeout"))]
    BuildTimedOut { step: String, timeout: Duration },
}

// ============================================================================
// Test Discovery Interface
// ============================================================================

/// Find the tests in a directory.
pub trait TestDiscovery {
    /// Return the identifiers of all tests in `dir`, sorted.
    fn discover(&self, dir: &Path) -> Result<Vec<TestId>, HarnessError>;
}

// ============================================================================
// Build Interfaces
// ============================================================================

/// Clean/build steps over a whole test directory.
///
/// `cleanup` is paired with `prepare` by `build::CleanupGuard`; implementations do not need to
/// track whether `prepare` ran.
pub trait BuildSystem {
    /// Clean, then build every test binary in `dir`.
    fn prepare(&self, dir: &Path) -> Result<(), HarnessError>;

    /// Remove build artifacts from `dir`.
    fn cleanup(&self, dir: &Path) -> Result<(), HarnessError>;
}

/// Compile a single source with a trusted compiler.
pub trait ReferenceToolchain {
    /// Compile `source` into an executable at `output`. Failure is a status, never an error.
    fn compile_one(&self, source: &Path, output: &Path) -> CompileStatus;
}

// ============================================================================
// Test Executor Interface
// ============================================================================

/// Run one compiled binary and capture its output.
pub trait TestExecutor {
    fn run(&self, binary: &Path, timeout: Duration) -> RunOutcome;
}

// ============================================================================
// Comparator Interface
// ============================================================================

/// Produce the output a test is expected to print.
///
/// Implementations differ only in where the expectation comes from; the equality applied to it is
/// always `difftest_core::strip_eq`.
pub trait Comparator {
    fn expected_output(&self, id: &TestId) -> Expectation;

    /// Remove any artifacts created while producing expectations.
    fn teardown(&self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Filesystem-based test discovery.
pub struct DefaultTestDiscovery {
    pub extension: String,
}

impl TestDiscovery for DefaultTestDiscovery {
    fn discover(&self, dir: &Path) -> Result<Vec<TestId>, HarnessError> {
        crate::catalog::discover_tests(dir, &self.extension)
    }
}

/// Subprocess execution with piped output and a kill-on-timeout watchdog.
pub struct DefaultTestExecutor;

impl TestExecutor for DefaultTestExecutor {
    fn run(&self, binary: &Path, timeout: Duration) -> RunOutcome {
        crate::exec::run_binary(binary, timeout)
    }
}
