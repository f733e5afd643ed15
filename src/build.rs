//! Build orchestration: clean/build the test directory, compile single files with the reference toolchain.
//!
//! Build output is never parsed. A failed build shows up later as a missing binary for the affected
//! tests, so a non-zero build status is only logged.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::cli::test_interfaces::{BuildSystem, Comparator, HarnessError, ReferenceToolchain};
use crate::exec::{Supervised, output_with_timeout};

/// `make`-style build tool: `<tool> <clean_target>` then `<tool>`, run inside the test directory.
#[derive(Debug, Clone)]
pub struct MakeBuild {
    pub tool: String,
    pub clean_target: String,
    pub timeout: Duration,
}

impl MakeBuild {
    pub fn new(tool: impl Into<String>, clean_target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tool: tool.into(),
            clean_target: clean_target.into(),
            timeout,
        }
    }

    /// Run the build tool with `args` in `dir`.
    ///
    /// The directory is handed to the subprocess as its working directory; the harness's own current
    /// directory is never changed.
    fn step(&self, dir: &Path, args: &[&str]) -> Result<(), HarnessError> {
        let step = if args.is_empty() {
            self.tool.clone()
        } else {
            format!("{} {}", self.tool, args.join(" "))
        };
        tracing::debug!(%step, dir = %dir.display(), "running build step");

        let mut cmd = Command::new(&self.tool);
        cmd.args(args).current_dir(dir);
        let outcome = output_with_timeout(&mut cmd, self.timeout).map_err(|source| HarnessError::BuildToolUnavailable {
            tool: self.tool.clone(),
            source,
        })?;

        match outcome {
            Supervised::Exited(result) if result.success() => {}
            Supervised::Exited(result) => tracing::warn!(
                %step,
                code = ?result.code,
                stderr = %result.stderr_text().trim_end(),
                "build step failed; affected tests will be skipped"
            ),
            Supervised::OutputIncomplete { code } => tracing::warn!(
                %step,
                ?code,
                "build step left processes holding its output; they were killed"
            ),
            Supervised::TimedOut => {
                return Err(HarnessError::BuildTimedOut {
                    step,
                    timeout: self.timeout,
                });
            }
        }
        Ok(())
    }
}

impl BuildSystem for MakeBuild {
    #[tracing::instrument(skip_all, fields(dir = %dir.display()))]
    fn prepare(&self, dir: &Path) -> Result<(), HarnessError> {
        self.step(dir, &[self.clean_target.as_str()])?;
        self.step(dir, &[])?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(dir = %dir.display()))]
    fn cleanup(&self, dir: &Path) -> Result<(), HarnessError> {
        self.step(dir, &[self.clean_target.as_str()])?;
        Ok(())
    }
}

/// Result of compiling one file with the reference toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileStatus {
    Compiled,
    /// The compiler ran and rejected the input.
    Failed { code: Option<i32> },
    TimedOut,
    /// The compiler could not be started (not installed, not executable, output directory unusable).
    Unavailable(String),
}

/// Reference compiler invoked as `<program> [args...] -o <output> <source>`.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandToolchain {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

impl ReferenceToolchain for CommandToolchain {
    #[tracing::instrument(skip_all, fields(source = %source.display(), compiler = %self.program))]
    fn compile_one(&self, source: &Path, output: &Path) -> CompileStatus {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                return CompileStatus::Unavailable(format!("cannot create '{}': {}", parent.display(), e));
            }
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg("-o").arg(output).arg(source);
        match output_with_timeout(&mut cmd, self.timeout) {
            Ok(Supervised::Exited(result)) if result.success() => CompileStatus::Compiled,
            Ok(Supervised::Exited(result)) => {
                tracing::debug!(
                    code = ?result.code,
                    stderr = %result.stderr_text().trim_end(),
                    "reference compile failed"
                );
                CompileStatus::Failed { code: result.code }
            }
            // Only the exit status matters for a compile.
            Ok(Supervised::OutputIncomplete { code: Some(0) }) => CompileStatus::Compiled,
            Ok(Supervised::OutputIncomplete { code }) => CompileStatus::Failed { code },
            Ok(Supervised::TimedOut) => CompileStatus::TimedOut,
            Err(e) => CompileStatus::Unavailable(e.to_string()),
        }
    }
}

/// Scope guard pairing `BuildSystem::prepare` with exactly one `cleanup`.
///
/// Create it before `prepare` runs. Cleanup happens in `finish`, or in `Drop` when the run ends early
/// (an error returned with `?`, a panic in a reporter). Cleanup errors are logged, never returned: they
/// cannot change any test's verdict.
pub struct CleanupGuard<'a> {
    build: &'a dyn BuildSystem,
    comparator: &'a dyn Comparator,
    dir: PathBuf,
    done: bool,
}

impl<'a> CleanupGuard<'a> {
    pub fn new(build: &'a dyn BuildSystem, comparator: &'a dyn Comparator, dir: &Path) -> Self {
        Self {
            build,
            comparator,
            dir: dir.to_path_buf(),
            done: false,
        }
    }

    /// Run cleanup now.
    pub fn finish(mut self) {
        self.run_cleanup();
    }

    fn run_cleanup(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if let Err(e) = self.comparator.teardown() {
            tracing::warn!(error = %e, "failed to remove reference artifacts");
        }
        if let Err(e) = self.build.cleanup(&self.dir) {
            tracing::warn!(error = %e, "cleanup failed");
        }
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        self.run_cleanup();
    }
}
