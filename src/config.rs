//! Harness configuration
//!
//! A plain value type with defaults and `with_*` builders. The CLI fills it from its arguments;
//! tests build it directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// How expected output is obtained for each test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Compare against `<id>.out` stored next to the source.
    #[default]
    Golden,
    /// Compare against the live output of the same source built by the reference toolchain.
    Differential,
}

/// Report format written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Console,
    /// One JSON object per line.
    Json,
}

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Directory holding the test sources, golden files and the build script
    pub test_dir: PathBuf,
    /// Comparison strategy
    pub mode: Mode,
    /// Source extension without the leading dot
    pub source_extension: String,
    /// Golden file extension without the leading dot
    pub golden_extension: String,
    /// Build tool run as `<tool> clean` and `<tool>` in the test directory
    pub build_tool: String,
    /// Target passed to the build tool for the clean step
    pub clean_target: String,
    /// Reference compiler program (differential mode)
    pub reference_compiler: String,
    /// Extra arguments placed before `-o <out> <src>` on the reference compiler command line
    pub reference_args: Vec<String>,
    /// Timeout for each test binary, reference compile and reference binary
    pub run_timeout: Duration,
    /// Timeout for each clean/build step
    pub build_timeout: Duration,
    /// Stop after the first failed test
    pub stop_on_fail: bool,
    /// Only run tests whose identifier contains this keyword
    pub filter: Option<String>,
    pub verbose: bool,
    pub color: bool,
    pub format: OutputFormat,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("."),
            mode: Mode::Golden,
            source_extension: "c".to_string(),
            golden_extension: "out".to_string(),
            build_tool: "make".to_string(),
            clean_target: "clean".to_string(),
            reference_compiler: "clang".to_string(),
            reference_args: Vec::new(),
            run_timeout: Duration::from_secs(5),
            build_timeout: Duration::from_secs(300),
            stop_on_fail: false,
            filter: None,
            verbose: false,
            color: false,
            format: OutputFormat::Console,
        }
    }
}

impl HarnessConfig {
    /// Create a config for `test_dir` with default settings
    pub fn new(test_dir: impl Into<PathBuf>) -> Self {
        Self {
            test_dir: test_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_build_tool(mut self, tool: impl Into<String>) -> Self {
        self.build_tool = tool.into();
        self
    }

    pub fn with_reference_compiler(mut self, program: impl Into<String>) -> Self {
        self.reference_compiler = program.into();
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn with_filter(mut self, keyword: impl Into<String>) -> Self {
        self.filter = Some(keyword.into());
        self
    }

    pub fn with_stop_on_fail(mut self, stop: bool) -> Self {
        self.stop_on_fail = stop;
        self
    }

    /// Path of the binary the build step produces for `id`.
    pub fn binary_path(&self, id: &str) -> PathBuf {
        self.test_dir.join(id)
    }

    /// Scratch directory for reference binaries, removed by cleanup.
    pub fn reference_dir(&self) -> PathBuf {
        reference_dir_in(&self.test_dir)
    }
}

/// Name of the scratch directory holding reference binaries inside a test directory.
pub const REFERENCE_DIR_NAME: &str = ".difftest-ref";

pub fn reference_dir_in(test_dir: &Path) -> PathBuf {
    test_dir.join(REFERENCE_DIR_NAME)
}
