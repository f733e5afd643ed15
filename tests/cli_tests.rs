//! End-to-end tests for the `difftest` binary.
//!
//! Each test lays out a temporary test directory. Shell scripts stand in for the compiled test binaries,
//! the build tool and the reference compiler.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_difftest");

fn script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// A test directory with a compiled binary that prints `stdout`.
struct Suite {
    dir: TempDir,
}

impl Suite {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add `<name>.c` (containing `source`) and a prebuilt binary printing `stdout`.
    fn test(&self, name: &str, source: &str, stdout: &str) -> &Self {
        fs::write(self.path().join(format!("{name}.c")), source).unwrap();
        script(&self.path().join(name), &format!("printf '%s' '{stdout}'"));
        self
    }

    fn golden(&self, name: &str, contents: &str) -> &Self {
        fs::write(self.path().join(format!("{name}.out")), contents).unwrap();
        self
    }

    /// A build tool outside the test directory that appends its arguments to `build.log`.
    fn logging_build_tool(&self, tools: &Path) -> PathBuf {
        let tool = tools.join("fake-make");
        let log = self.path().join("build.log");
        script(&tool, &format!("echo \"step:$*\" >> '{}'", log.display()));
        tool
    }

    fn build_log(&self) -> String {
        fs::read_to_string(self.path().join("build.log")).unwrap_or_default()
    }

    fn run(&self, args: &[&str]) -> Output {
        self.run_with_build_tool(Path::new("true"), args)
    }

    fn run_with_build_tool(&self, build_tool: &Path, args: &[&str]) -> Output {
        Command::new(BIN)
            .arg("-d")
            .arg(self.path())
            .arg("--build-tool")
            .arg(build_tool)
            .arg("--no-color")
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A reference compiler that "compiles" a source into a program printing the source text.
/// Sources named `broken.c` fail to compile.
fn fake_reference_cc(tools: &Path) -> PathBuf {
    let cc = tools.join("fake-cc");
    script(
        &cc,
        r#"out="$2"; src="$3"
case "$src" in *broken.c) echo "broken.c:1: error" >&2; exit 1;; esac
printf '#!/bin/sh\ncat "%s"\n' "$src" > "$out"
chmod +x "$out""#,
    );
    cc
}

#[test]
fn empty_directory_passes() {
    let suite = Suite::new();
    let output = suite.run(&[]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("0/0 tests passed."), "{text}");
    assert!(text.contains("0 passed / 0 failed / 0 skipped"), "{text}");
}

#[test]
fn golden_mode_mixed_results() {
    let suite = Suite::new();
    suite
        .test("add", "", "3")
        .golden("add", "3\n")
        .test("bad", "", "whatever")
        .test("loop", "", "1 2 3")
        .golden("loop", "1 2 4\n");

    let output = suite.run(&[]);
    assert_eq!(output.status.code(), Some(1));

    let text = stdout(&output);
    assert!(text.contains("Running test 0: add\nPASSED"), "{text}");
    assert!(text.contains("Running test 1: bad\nSKIPPED: golden file not found"), "{text}");
    assert!(text.contains("FAILED\nExpected:\n1 2 4\nFound:\n1 2 3\n"), "{text}");
    assert!(text.contains("1/3 tests passed."), "{text}");
    assert!(text.contains("1/3 tests failed."), "{text}");
    assert!(text.contains("1/3 tests skipped."), "{text}");
    assert!(!text.contains("Success"), "{text}");
}

#[test]
fn all_passing_suite_reports_success() {
    let suite = Suite::new();
    suite.test("add", "", "3").golden("add", "  3\n\n");

    let output = suite.run(&[]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("Success: all tests passed."));
}

#[test]
fn skips_alone_exit_zero_with_success_line() {
    let suite = Suite::new();
    suite.test("bad", "", "x");
    fs::write(suite.path().join("ghost.c"), "").unwrap();

    let output = suite.run(&[]);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("SKIPPED: binary missing"), "{text}");
    assert!(text.contains("2/2 tests skipped."), "{text}");
    assert!(text.contains("Success: all tests passed."), "{text}");
}

#[test]
fn crashing_binary_is_skipped() {
    let suite = Suite::new();
    fs::write(suite.path().join("seg.c"), "").unwrap();
    script(&suite.path().join("seg"), "printf partial\nexit 3");
    suite.golden("seg", "partial");

    let output = suite.run(&[]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("SKIPPED: test binary exited with status 3"));
}

#[test]
fn hanging_binary_times_out() {
    let suite = Suite::new();
    fs::write(suite.path().join("hang.c"), "").unwrap();
    script(&suite.path().join("hang"), "exec sleep 30");
    suite.golden("hang", "");

    let output = suite.run(&["--timeout", "0.3"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("SKIPPED: timed out"));
}

#[test]
fn differential_mode() {
    let tools = tempfile::tempdir().unwrap();
    let cc = fake_reference_cc(tools.path());

    let suite = Suite::new();
    suite
        .test("add", "3", "3\n")
        .test("loop", "1 2 4", "1 2 3")
        .test("broken", "int main( {", "");
    // Golden files are ignored in differential mode.
    suite.golden("add", "nonsense");

    let output = suite.run(&["-m", "differential", "--reference-cc", cc.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let text = stdout(&output);
    assert!(text.contains("Running test 0: add\nPASSED"), "{text}");
    assert!(text.contains("SKIPPED: could not compile the test file"), "{text}");
    assert!(text.contains("Expected:\n1 2 4\nFound:\n1 2 3\n"), "{text}");
    assert!(text.contains("1 passed / 1 failed / 1 skipped"), "{text}");

    // Reference binaries do not outlive the run.
    assert!(!suite.path().join(".difftest-ref").exists());
}

#[test]
fn differential_mode_without_subject_binary_is_a_compile_failure() {
    let tools = tempfile::tempdir().unwrap();
    let cc = fake_reference_cc(tools.path());

    let suite = Suite::new();
    fs::write(suite.path().join("ghost.c"), "3").unwrap();

    let output = suite.run(&["-m", "differential", "--reference-cc", cc.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("Running test 0: ghost\nSKIPPED: could not compile the test file"), "{text}");
}

#[test]
fn background_job_holding_stdout_does_not_hang_the_suite() {
    let suite = Suite::new();
    fs::write(suite.path().join("bg.c"), "").unwrap();
    script(&suite.path().join("bg"), "printf 3\nsleep 3 &\nexit 0");
    suite.golden("bg", "3");

    let start = std::time::Instant::now();
    let output = suite.run(&[]);
    assert!(start.elapsed() < std::time::Duration::from_secs(3));
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("Running test 0: bg\nPASSED"));
}

#[test]
fn build_runs_clean_build_then_clean() {
    let tools = tempfile::tempdir().unwrap();
    let suite = Suite::new();
    suite.test("add", "", "3").golden("add", "3");
    let make = suite.logging_build_tool(tools.path());

    let output = suite.run_with_build_tool(&make, &[]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(suite.build_log(), "step:clean\nstep:\nstep:clean\n");
}

#[test]
fn exitfirst_still_cleans_up() {
    let tools = tempfile::tempdir().unwrap();
    let suite = Suite::new();
    suite
        .test("a", "", "1")
        .golden("a", "2")
        .test("b", "", "1")
        .golden("b", "1");
    let make = suite.logging_build_tool(tools.path());

    let output = suite.run_with_build_tool(&make, &["-x"]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(!text.contains("Running test 1: b"), "{text}");
    assert!(text.contains("0/1 tests passed."), "{text}");
    assert!(suite.build_log().ends_with("step:clean\n"));
}

#[test]
fn keyword_filter_selects_tests() {
    let suite = Suite::new();
    suite
        .test("trace_add", "", "3")
        .golden("trace_add", "3")
        .test("loop", "", "1")
        .golden("loop", "2");

    let output = suite.run(&["-k", "trace"]);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("1/1 tests passed."), "{text}");
    assert!(!text.contains("loop"), "{text}");
}

#[test]
fn json_format() {
    let suite = Suite::new();
    suite.test("add", "", "3").golden("add", "3").test("bad", "", "x");

    let output = suite.run(&["--format", "json"]);
    assert_eq!(output.status.code(), Some(0));

    let events: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.first().unwrap()["event"], "collected");
    let summary = events.last().unwrap();
    assert_eq!(summary["event"], "summary");
    assert_eq!(summary["passed"], 1);
    assert_eq!(summary["skipped"], 1);
    assert_eq!(summary["skipped_tests"], serde_json::json!(["bad"]));
}

#[test]
fn missing_directory_aborts() {
    let parent = tempfile::tempdir().unwrap();
    let missing = parent.path().join("nope");

    let output = Command::new(BIN)
        .arg("-d")
        .arg(&missing)
        .args(["--build-tool", "true"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn unavailable_build_tool_aborts() {
    let suite = Suite::new();
    suite.test("add", "", "3").golden("add", "3");

    let output = suite.run_with_build_tool(Path::new("/nonexistent/make"), &[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not start build tool"));
}
