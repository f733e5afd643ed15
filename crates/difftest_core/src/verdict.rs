//! Define per-test verdicts and the canonical reasons a test is skipped.
//!
//! A skipped test never counts as a regression: it signals a missing fixture or an environment gap
//! (no reference compiler, a binary that did not build), not a defect in the compiler under test.

use std::borrow::Cow;
use std::fmt;

use crate::strip::strip_eq;

/// Skip message for a test whose golden file does not exist.
pub const GOLDEN_FILE_NOT_FOUND_MSG: &str = "golden file not found";
/// Skip message for a test that either toolchain failed to compile (differential mode).
pub const COMPILE_FAILED_MSG: &str = "could not compile the test file";
/// Skip message for a test whose binary was not produced by the build step.
pub const BINARY_MISSING_MSG: &str = "binary missing";
/// Skip message for a subprocess killed after exceeding its timeout.
pub const TIMED_OUT_MSG: &str = "timed out";
/// Skip message for a process whose output could not be read to the end.
pub const OUTPUT_INCOMPLETE_MSG: &str = "output could not be captured in full";

/// Describe how a process terminated, for skip messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited with a non-zero status code.
    Code(i32),
    /// Terminated without an exit code (killed by a signal on unix).
    Signal,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Code(code) => write!(f, "exited with status {code}"),
            Termination::Signal => f.write_str("was terminated by a signal"),
        }
    }
}

/// Reason a test was classified as skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The build step did not produce a binary for this test.
    BinaryMissing,
    /// The binary exists but could not be started.
    NotExecutable(String),
    /// The binary under test did not exit successfully.
    Crashed(Termination),
    /// A subprocess (test binary, reference compile or reference binary) exceeded its timeout.
    TimedOut,
    /// Golden-file mode: `<id>.out` does not exist.
    GoldenFileMissing,
    /// Golden-file mode: `<id>.out` exists but could not be read.
    GoldenFileUnreadable(String),
    /// Differential mode: the reference toolchain could not compile the source, or the compiler under test
    /// left no binary for it.
    CompileFailed,
    /// Differential mode: the reference binary did not exit successfully.
    ReferenceCrashed(Termination),
    /// The test or reference binary exited, but its output pipes stayed open past the drain deadline.
    OutputIncomplete,
}

impl SkipReason {
    /// Return the one-line message printed for this skip.
    pub fn message(&self) -> Cow<'static, str> {
        match self {
            SkipReason::BinaryMissing => Cow::Borrowed(BINARY_MISSING_MSG),
            SkipReason::NotExecutable(detail) => Cow::Owned(format!("binary not executable: {detail}")),
            SkipReason::Crashed(how) => Cow::Owned(format!("test binary {how}")),
            SkipReason::TimedOut => Cow::Borrowed(TIMED_OUT_MSG),
            SkipReason::GoldenFileMissing => Cow::Borrowed(GOLDEN_FILE_NOT_FOUND_MSG),
            SkipReason::GoldenFileUnreadable(detail) => Cow::Owned(format!("golden file unreadable: {detail}")),
            SkipReason::CompileFailed => Cow::Borrowed(COMPILE_FAILED_MSG),
            SkipReason::ReferenceCrashed(how) => Cow::Owned(format!("reference binary {how}")),
            SkipReason::OutputIncomplete => Cow::Borrowed(OUTPUT_INCOMPLETE_MSG),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Expected and actual output of a failed comparison, kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: Vec<u8>,
    pub actual: Vec<u8>,
}

impl Mismatch {
    /// Expected output decoded for display (invalid UTF-8 is replaced).
    pub fn expected_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.expected)
    }

    /// Actual output decoded for display (invalid UTF-8 is replaced).
    pub fn actual_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.actual)
    }
}

/// Classification of one test in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed(Mismatch),
    Skipped(SkipReason),
}

impl Verdict {
    /// Judge actual output against expected output under strip-equality.
    pub fn judge(expected: Vec<u8>, actual: Vec<u8>) -> Self {
        if strip_eq(&expected, &actual) {
            Verdict::Passed
        } else {
            Verdict::Failed(Mismatch { expected, actual })
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Verdict::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Verdict::Skipped(_))
    }

    /// Short status word used by reporters.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Passed => "PASSED",
            Verdict::Failed(_) => "FAILED",
            Verdict::Skipped(_) => "SKIPPED",
        }
    }
}
