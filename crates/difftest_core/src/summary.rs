//! Aggregate verdicts of one run into a summary.
//!
//! `SummaryBuilder` grows monotonically while the suite runs; `finish` freezes it into a `RunSummary`
//! that is rendered once and never changed.

use crate::TestId;
use crate::verdict::Verdict;

/// Accumulates verdicts in the order tests were run.
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    total: usize,
    failed: Vec<TestId>,
    skipped: Vec<TestId>,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the verdict of one test.
    pub fn record(&mut self, test: &TestId, verdict: &Verdict) {
        self.total += 1;
        match verdict {
            Verdict::Passed => {}
            Verdict::Failed(_) => self.failed.push(test.clone()),
            Verdict::Skipped(_) => self.skipped.push(test.clone()),
        }
    }

    pub fn finish(self) -> RunSummary {
        RunSummary {
            total: self.total,
            failed: self.failed,
            skipped: self.skipped,
        }
    }
}

/// Final tallies of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    total: usize,
    failed: Vec<TestId>,
    skipped: Vec<TestId>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn passed(&self) -> usize {
        self.total - self.failed.len() - self.skipped.len()
    }

    pub fn failed(&self) -> usize {
        self.failed.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped.len()
    }

    /// Failed tests, in run order.
    pub fn failed_tests(&self) -> &[TestId] {
        &self.failed
    }

    /// Skipped tests, in run order.
    pub fn skipped_tests(&self) -> &[TestId] {
        &self.skipped
    }

    /// A run succeeds when no test failed. Skipped tests do not affect success.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
