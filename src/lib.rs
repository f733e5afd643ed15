#![forbid(unsafe_code)]
//! Differential test harness for a C compiler
//!
//! The harness builds a directory of C test programs with the compiler under test (through the directory's
//! build script), runs each resulting binary, and compares its stdout against either a stored golden file or
//! the output of the same program built by a reference compiler. Each test is classified as passed, failed
//! or skipped, and the run ends with a summary and an exit status.
//!
//! ## Layout
//!
//! - `catalog`: discover test identifiers in the test directory
//! - `build`: the build step, cleanup guard and reference toolchain
//! - `exec`: subprocess execution with captured output and timeouts
//! - `compare`: golden-file and differential comparators
//! - `cli`: argument parsing, classification, aggregation and reporting
//!
//! Verdicts, strip-equality and the run summary live in the I/O-free `difftest_core` crate.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod build;
pub mod catalog;
pub mod cli;
pub mod compare;
pub mod config;
pub mod exec;
pub mod version;

pub use cli::test_interfaces::HarnessError;
pub use config::{HarnessConfig, Mode, OutputFormat};
pub use difftest_core::{RunSummary, SkipReason, TestId, Verdict};
