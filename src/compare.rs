//! Comparators: where a test's expected output comes from.
//!
//! - `GoldenFile` reads `<dir>/<id>.<golden_ext>`.
//! - `Differential` builds the same source with the reference toolchain and runs it.
//!
//! Both hand back an `Expectation`; the classifier judges it with `Verdict::judge`, so the equality
//! rule is shared by construction.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use difftest_core::{SkipReason, TestId};

use crate::build::{CommandToolchain, CompileStatus};
use crate::cli::test_interfaces::{Comparator, DefaultTestExecutor, ReferenceToolchain, TestExecutor};
use crate::config::{HarnessConfig, Mode};
use crate::exec::RunOutcome;

/// Expected output for one test, or the reason there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    Expected(Vec<u8>),
    Unavailable(SkipReason),
}

/// Expected output stored next to the source.
#[derive(Debug, Clone)]
pub struct GoldenFile {
    pub dir: PathBuf,
    pub extension: String,
}

impl GoldenFile {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    fn path(&self, id: &TestId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, self.extension))
    }
}

impl Comparator for GoldenFile {
    fn expected_output(&self, id: &TestId) -> Expectation {
        let path = self.path(id);
        match fs::read(&path) {
            Ok(bytes) => Expectation::Expected(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Expectation::Unavailable(SkipReason::GoldenFileMissing),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot read golden file");
                Expectation::Unavailable(SkipReason::GoldenFileUnreadable(e.to_string()))
            }
        }
    }
}

/// Expected output produced live by the reference toolchain.
///
/// Reference binaries go to a scratch directory that `teardown` removes.
pub struct Differential<T, E> {
    pub toolchain: T,
    pub executor: E,
    pub test_dir: PathBuf,
    pub source_extension: String,
    pub scratch_dir: PathBuf,
    pub timeout: Duration,
}

impl<T: ReferenceToolchain, E: TestExecutor> Differential<T, E> {
    fn source_path(&self, id: &TestId) -> PathBuf {
        self.test_dir.join(format!("{}.{}", id, self.source_extension))
    }
}

impl<T: ReferenceToolchain, E: TestExecutor> Comparator for Differential<T, E> {
    #[tracing::instrument(skip_all, fields(test = %id))]
    fn expected_output(&self, id: &TestId) -> Expectation {
        let binary = self.scratch_dir.join(id.as_str());
        match self.toolchain.compile_one(&self.source_path(id), &binary) {
            CompileStatus::Compiled => {}
            CompileStatus::TimedOut => return Expectation::Unavailable(SkipReason::TimedOut),
            status => {
                tracing::debug!(?status, "reference toolchain could not compile the test");
                return Expectation::Unavailable(SkipReason::CompileFailed);
            }
        }

        match self.executor.run(&binary, self.timeout) {
            RunOutcome::Completed(result) => match result.termination() {
                None => Expectation::Expected(result.stdout),
                Some(how) => Expectation::Unavailable(SkipReason::ReferenceCrashed(how)),
            },
            RunOutcome::TimedOut => Expectation::Unavailable(SkipReason::TimedOut),
            RunOutcome::OutputIncomplete => Expectation::Unavailable(SkipReason::OutputIncomplete),
            // The compiler reported success without leaving a runnable binary.
            RunOutcome::Missing | RunOutcome::NotExecutable(_) => {
                Expectation::Unavailable(SkipReason::CompileFailed)
            }
        }
    }

    fn teardown(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.scratch_dir) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Build the comparator selected by `config.mode`.
pub fn comparator_for(config: &HarnessConfig) -> Box<dyn Comparator> {
    match config.mode {
        Mode::Golden => Box::new(GoldenFile::new(&config.test_dir, &config.golden_extension)),
        Mode::Differential => Box::new(Differential {
            toolchain: CommandToolchain::new(
                &config.reference_compiler,
                config.reference_args.clone(),
                config.run_timeout,
            ),
            executor: DefaultTestExecutor,
            test_dir: config.test_dir.clone(),
            source_extension: config.source_extension.clone(),
            scratch_dir: config.reference_dir(),
            timeout: config.run_timeout,
        }),
    }
}
