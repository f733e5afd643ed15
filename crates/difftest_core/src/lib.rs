//! Provide the pure semantic core of the difftest harness.
//!
//! This crate holds the pieces of the harness whose behavior must never drift between comparison
//! modes or reporters:
//! - test identifiers (`TestId`),
//! - strip-equality (`strip`, `strip_eq`),
//! - per-test verdicts and their canonical skip messages (`Verdict`, `SkipReason`),
//! - the aggregate run summary (`SummaryBuilder`, `RunSummary`).
//!
//! ## Notes
//!
//! - **No IO**, no global state, no dependencies. Subprocesses and the filesystem live in the `difftest` crate.

pub mod strip;
pub mod summary;
pub mod verdict;

use std::fmt;

pub use strip::{strip, strip_eq};
pub use summary::{RunSummary, SummaryBuilder};
pub use verdict::{Mismatch, SkipReason, Termination, Verdict};

/// Name of one test, derived from a source file name with its extension removed.
///
/// By convention the compiled binary and the golden file share this name (`add.c` -> `add`, `add.out`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestId(String);

impl TestId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derive an identifier from a file name ending in `extension` (given without the leading dot).
    ///
    /// ## Returns
    /// - `Some(TestId)` when `file_name` is `<stem>.<extension>` with a non-empty stem.
    /// - `None` otherwise.
    pub fn from_file_name(file_name: &str, extension: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
