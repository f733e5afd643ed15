//! Test runner: classify each test and report the run.
//!
//! ## Flow
//!
//! 1. Discover test identifiers in the test directory (fatal on error, nothing else runs)
//! 2. Arm the cleanup guard, then run the build step over the directory
//! 3. For each test: run the binary, obtain the expected output, judge under strip-equality
//! 4. Clean up, then print the summary exactly once
//!
//! ## TestReporter Trait
//!
//! Reporting is separated from classification through the `TestReporter` trait. `ConsoleReporter`
//! prints the human-readable report, `JsonReporter` prints one JSON object per line.

use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use difftest_core::{RunSummary, SkipReason, SummaryBuilder, TestId, Verdict};

use super::test_interfaces::{
    BuildSystem, Comparator, DefaultTestDiscovery, DefaultTestExecutor, HarnessError, TestDiscovery, TestExecutor,
};
use super::{CliError, CliResult, ExitCode};
use crate::build::{CleanupGuard, MakeBuild};
use crate::compare::{Expectation, comparator_for};
use crate::config::{HarnessConfig, Mode, OutputFormat};
use crate::exec::RunOutcome;

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting test execution results.
pub trait TestReporter {
    /// Called once the tests to run are known
    fn on_collection_complete(&mut self, test_count: usize);

    /// Called before a test runs
    fn on_test_start(&mut self, index: usize, test: &TestId);

    /// Called when a test has a verdict
    fn on_test_complete(&mut self, test: &TestId, report: &TestReport);

    /// Called exactly once, after cleanup
    fn on_run_complete(&mut self, summary: &RunSummary, duration: Duration);
}

/// Verdict of one test plus what was captured while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub verdict: Verdict,
    pub duration: Duration,
    /// stderr of the binary under test (empty if it never ran)
    pub stderr: Vec<u8>,
}

const SEPARATOR: &str = "==============================";

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD_GREEN: &str = "\x1b[1;32m";
const BOLD_RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

fn paint(text: &str, color: &str, enabled: bool) -> String {
    if enabled {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Console reporter: per-test progress, expected/found blocks for failures, summary.
pub struct ConsoleReporter<W: Write> {
    out: W,
    pub verbose: bool,
    pub color: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool, color: bool) -> Self {
        Self { out, verbose, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // A closed stdout must not abort the run before cleanup, so write errors are dropped.
    fn emit(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
    }
}

impl<W: Write> TestReporter for ConsoleReporter<W> {
    fn on_collection_complete(&mut self, test_count: usize) {
        if test_count == 0 {
            self.emit("No tests collected\n");
        } else {
            self.emit(&format!("collected {test_count} test(s)\n\n"));
        }
    }

    fn on_test_start(&mut self, index: usize, test: &TestId) {
        self.emit(&format!("Running test {index}: {test}\n"));
    }

    fn on_test_complete(&mut self, _test: &TestId, report: &TestReport) {
        let mut status = match &report.verdict {
            Verdict::Passed => paint("PASSED", GREEN, self.color),
            Verdict::Failed(_) => paint("FAILED", RED, self.color),
            Verdict::Skipped(reason) => format!("{}: {}", paint("SKIPPED", YELLOW, self.color), reason),
        };
        if self.verbose {
            status.push_str(&format!(" ({}ms)", report.duration.as_millis()));
        }
        let mut text = format!("{status}\n");

        if let Verdict::Failed(mismatch) = &report.verdict {
            text.push_str(&format!(
                "Expected:\n{}\nFound:\n{}\n",
                mismatch.expected_text().trim_end_matches('\n'),
                mismatch.actual_text().trim_end_matches('\n')
            ));
        }
        let show_stderr = matches!(report.verdict, Verdict::Failed(_) | Verdict::Skipped(SkipReason::Crashed(_)));
        if self.verbose && show_stderr && !report.stderr.is_empty() {
            text.push_str(&format!(
                "stderr:\n{}\n",
                String::from_utf8_lossy(&report.stderr).trim_end_matches('\n')
            ));
        }
        text.push_str(SEPARATOR);
        text.push('\n');
        self.emit(&text);
    }

    fn on_run_complete(&mut self, summary: &RunSummary, duration: Duration) {
        let text = render_summary(summary, duration, self.color);
        self.emit(&format!("\n{text}"));
        let _ = self.out.flush();
    }
}

/// Render the end-of-run summary.
///
/// ```text
/// 1/2 tests passed.
/// 1/2 tests failed.
/// Failed: loop
/// ====== 1 passed / 1 failed / 0 skipped in 0.02s ======
/// ```
pub fn render_summary(summary: &RunSummary, duration: Duration, color: bool) -> String {
    let total = summary.total();
    let mut text = String::new();

    if summary.failed() == 0 {
        text.push_str(&paint("Success: all tests passed.", BOLD_GREEN, color));
        text.push('\n');
    }
    text.push_str(&format!("{}/{} tests passed.\n", summary.passed(), total));
    if summary.failed() > 0 {
        text.push_str(&paint(&format!("{}/{} tests failed.", summary.failed(), total), RED, color));
        text.push('\n');
    }
    if summary.skipped() > 0 {
        text.push_str(&paint(&format!("{}/{} tests skipped.", summary.skipped(), total), YELLOW, color));
        text.push('\n');
    }
    if !summary.failed_tests().is_empty() {
        text.push_str(&format!("Failed: {}\n", join_ids(summary.failed_tests())));
    }
    if !summary.skipped_tests().is_empty() {
        text.push_str(&format!("Skipped: {}\n", join_ids(summary.skipped_tests())));
    }

    let tally = format!(
        "====== {} passed / {} failed / {} skipped in {:.2}s ======",
        summary.passed(),
        summary.failed(),
        summary.skipped(),
        duration.as_secs_f64()
    );
    let tally_color = if summary.is_success() { BOLD_GREEN } else { BOLD_RED };
    text.push_str(&paint(&tally, tally_color, color));
    text.push('\n');
    text
}

fn join_ids(ids: &[TestId]) -> String {
    ids.iter().map(TestId::as_str).collect::<Vec<_>>().join(", ")
}

/// JSON lines reporter: one object per event.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, value: serde_json::Value) {
        let _ = writeln!(self.out, "{value}");
    }
}

impl<W: Write> TestReporter for JsonReporter<W> {
    fn on_collection_complete(&mut self, test_count: usize) {
        self.emit(serde_json::json!({ "event": "collected", "count": test_count }));
    }

    fn on_test_start(&mut self, _index: usize, _test: &TestId) {}

    fn on_test_complete(&mut self, test: &TestId, report: &TestReport) {
        let mut value = serde_json::json!({
            "event": "test",
            "name": test.as_str(),
            "verdict": report.verdict.label().to_lowercase(),
            "duration_ms": report.duration.as_millis() as u64,
        });
        match &report.verdict {
            Verdict::Passed => {}
            Verdict::Failed(mismatch) => {
                value["expected"] = mismatch.expected_text().into_owned().into();
                value["actual"] = mismatch.actual_text().into_owned().into();
            }
            Verdict::Skipped(reason) => {
                value["reason"] = reason.message().into_owned().into();
            }
        }
        self.emit(value);
    }

    fn on_run_complete(&mut self, summary: &RunSummary, duration: Duration) {
        let names = |ids: &[TestId]| ids.iter().map(|t| t.as_str().to_string()).collect::<Vec<_>>();
        self.emit(serde_json::json!({
            "event": "summary",
            "total": summary.total(),
            "passed": summary.passed(),
            "failed": summary.failed(),
            "skipped": summary.skipped(),
            "failed_tests": names(summary.failed_tests()),
            "skipped_tests": names(summary.skipped_tests()),
            "duration_s": duration.as_secs_f64(),
        }));
        let _ = self.out.flush();
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// The harness wired to its collaborators.
pub struct Harness<'a> {
    pub config: &'a HarnessConfig,
    pub discovery: &'a dyn TestDiscovery,
    pub build: &'a dyn BuildSystem,
    pub executor: &'a dyn TestExecutor,
    pub comparator: &'a dyn Comparator,
}

impl Harness<'_> {
    /// Classify one test.
    ///
    /// ```text
    /// run binary --(missing, not executable, timed out, non-zero exit)--> Skipped
    ///            --(output lost to a leftover background process)------> Skipped
    /// expected   --(golden/reference unavailable)-----------------------> Skipped
    /// judge      --(strip-equal)--> Passed
    ///            --(different)----> Failed
    /// ```
    pub fn classify(&self, test: &TestId) -> TestReport {
        let start = Instant::now();
        let skipped = |reason: SkipReason, stderr: Vec<u8>| TestReport {
            verdict: Verdict::Skipped(reason),
            duration: start.elapsed(),
            stderr,
        };

        let binary = self.config.binary_path(test.as_str());
        let actual = match self.executor.run(&binary, self.config.run_timeout) {
            RunOutcome::Completed(result) => result,
            RunOutcome::TimedOut => return skipped(SkipReason::TimedOut, Vec::new()),
            RunOutcome::Missing => return skipped(self.missing_binary_reason(), Vec::new()),
            RunOutcome::OutputIncomplete => return skipped(SkipReason::OutputIncomplete, Vec::new()),
            RunOutcome::NotExecutable(detail) => return skipped(SkipReason::NotExecutable(detail), Vec::new()),
        };
        if let Some(how) = actual.termination() {
            return skipped(SkipReason::Crashed(how), actual.stderr);
        }

        let verdict = match self.comparator.expected_output(test) {
            Expectation::Expected(expected) => Verdict::judge(expected, actual.stdout),
            Expectation::Unavailable(reason) => Verdict::Skipped(reason),
        };
        TestReport {
            verdict,
            duration: start.elapsed(),
            stderr: actual.stderr,
        }
    }

    /// In differential mode a missing binary means the compiler under test could not compile the file.
    fn missing_binary_reason(&self) -> SkipReason {
        match self.config.mode {
            Mode::Differential => SkipReason::CompileFailed,
            Mode::Golden => SkipReason::BinaryMissing,
        }
    }

    /// Run the whole suite.
    ///
    /// ## Errors
    ///
    /// Only run-aborting conditions are errors: discovery failures and a build tool that cannot run.
    /// Cleanup still runs for the latter.
    #[tracing::instrument(skip_all, fields(dir = %self.config.test_dir.display(), mode = ?self.config.mode))]
    pub fn run(&self, reporter: &mut dyn TestReporter) -> Result<RunSummary, HarnessError> {
        let start = Instant::now();
        let dir = self.config.test_dir.as_path();

        let mut tests = self.discovery.discover(dir)?;
        if let Some(keyword) = self.config.filter.as_deref() {
            tests.retain(|t| t.as_str().contains(keyword));
        }
        reporter.on_collection_complete(tests.len());

        let guard = CleanupGuard::new(self.build, self.comparator, dir);
        self.build.prepare(dir)?;

        let mut builder = SummaryBuilder::new();
        for (index, test) in tests.iter().enumerate() {
            reporter.on_test_start(index, test);
            let report = self.classify(test);
            tracing::debug!(test = %test, verdict = report.verdict.label(), "classified");
            builder.record(test, &report.verdict);
            reporter.on_test_complete(test, &report);

            if self.config.stop_on_fail && report.verdict.is_failed() {
                tracing::info!(test = %test, remaining = tests.len() - index - 1, "stopping after first failure");
                break;
            }
        }

        guard.finish();
        let summary = builder.finish();
        reporter.on_run_complete(&summary, start.elapsed());
        Ok(summary)
    }
}

/// Run the suite described by `config` with the real build tool, executor and comparator.
pub fn run_tests(config: &HarnessConfig) -> CliResult<ExitCode> {
    let discovery = DefaultTestDiscovery {
        extension: config.source_extension.clone(),
    };
    let build = MakeBuild::new(&config.build_tool, &config.clean_target, config.build_timeout);
    let executor = DefaultTestExecutor;
    let comparator = comparator_for(config);

    let harness = Harness {
        config,
        discovery: &discovery,
        build: &build,
        executor: &executor,
        comparator: comparator.as_ref(),
    };

    let stdout = io::stdout().lock();
    let result = match config.format {
        OutputFormat::Console => harness.run(&mut ConsoleReporter::new(stdout, config.verbose, config.color)),
        OutputFormat::Json => harness.run(&mut JsonReporter::new(stdout)),
    };

    match result {
        Ok(summary) if summary.is_success() => Ok(ExitCode::SUCCESS),
        // Failures were already reported; nothing more to print.
        Ok(_) => Err(CliError::new("", ExitCode::FAILURE)),
        Err(e) => Err(CliError::new(format!("{:?}", miette::Report::new(e)), ExitCode::ERROR)),
    }
}

/// Whether console output should be colored.
pub fn use_color(no_color_flag: bool) -> bool {
    !no_color_flag && std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
}
