//! Execution runner: run a subprocess, capture its output, enforce a timeout.
//!
//! Every subprocess the harness starts (test binaries, build steps, reference compiles) goes through
//! `output_with_timeout`, so none of them can stall the suite.
//!
//! ## Notes
//!
//! - stdout and stderr are drained on helper threads; a child that fills a pipe cannot deadlock.
//! - On unix each child leads its own process group. On timeout the whole group is killed, so
//!   grandchildren (a shell's background jobs, `make`'s compiler children) do not outlive the call.
//! - If the pipes stay open after the child exits (a background job inherited them), the group is
//!   killed and the output collected again. Output that still cannot be read to the end is reported as
//!   `Supervised::OutputIncomplete`, never as a shorter stream.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use difftest_core::verdict::Termination;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to wait for the output readers after the child has exited (and again after killing its group).
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Captured result of one process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code; `None` if the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// How the process ended, or `None` if it exited successfully.
    pub fn termination(&self) -> Option<Termination> {
        match self.code {
            Some(0) => None,
            Some(code) => Some(Termination::Code(code)),
            None => Some(Termination::Signal),
        }
    }

    pub fn stderr_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// How a supervised process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Supervised {
    /// Exited on its own; both streams were read to the end.
    Exited(ExecutionResult),
    /// Killed (with its process group) after exceeding the timeout.
    TimedOut,
    /// Exited, but stdout or stderr could not be read to the end.
    OutputIncomplete { code: Option<i32> },
}

/// Outcome of running a test binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The binary ran and exited (successfully or not).
    Completed(ExecutionResult),
    /// The binary was killed after exceeding the timeout.
    TimedOut,
    /// No binary exists at the path.
    Missing,
    /// The binary exists but could not be started.
    NotExecutable(String),
    /// The binary exited but its output could not be captured in full.
    OutputIncomplete,
}

/// Run `cmd` with piped stdout/stderr and a null stdin, killing its process group after `timeout`.
///
/// ## Errors
///
/// Returns the spawn error if the process could not be started.
pub fn output_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<Supervised> {
    let start = Instant::now();
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn()?;

    let stdout_rx = child.stdout.take().map(drain);
    let stderr_rx = child.stderr.take().map(drain);

    let deadline = start + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(pid = child.id(), ?timeout, "killing process group after timeout");
            kill_tree(&mut child);
            return Ok(Supervised::TimedOut);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    };
    let duration = start.elapsed();
    let code = status.code();

    let grace = Instant::now() + DRAIN_GRACE;
    let mut stdout = receive(stdout_rx.as_ref(), grace);
    let mut stderr = receive(stderr_rx.as_ref(), grace);
    if stdout.is_none() || stderr.is_none() {
        tracing::debug!(pid = child.id(), "output still held open after exit; killing process group");
        kill_group(child.id());
        let retry = Instant::now() + DRAIN_GRACE;
        if stdout.is_none() {
            stdout = receive(stdout_rx.as_ref(), retry);
        }
        if stderr.is_none() {
            stderr = receive(stderr_rx.as_ref(), retry);
        }
    }

    match (stdout, stderr) {
        (Some(stdout), Some(stderr)) => Ok(Supervised::Exited(ExecutionResult {
            code,
            stdout,
            stderr,
            duration,
        })),
        _ => {
            tracing::warn!(pid = child.id(), "could not read the full output of a finished process");
            Ok(Supervised::OutputIncomplete { code })
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        let _ = tx.send(buffer);
    });
    rx
}

/// Wait until `deadline` for a reader to hand over its stream; `None` if it has not reached EOF.
fn receive(rx: Option<&mpsc::Receiver<Vec<u8>>>, deadline: Instant) -> Option<Vec<u8>> {
    let Some(rx) = rx else {
        return Some(Vec::new());
    };
    rx.recv_timeout(deadline.saturating_duration_since(Instant::now())).ok()
}

fn kill_tree(child: &mut Child) {
    kill_group(child.id());
    // The child may have exited between try_wait and kill; either way reap it.
    let _ = child.kill();
    let _ = child.wait();
}

/// Send SIGKILL to the process group led by `leader`.
#[cfg(unix)]
fn kill_group(leader: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pgid) = i32::try_from(leader) else {
        return;
    };
    // ESRCH only means every member has already exited.
    if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        tracing::trace!(pgid, error = %e, "killpg");
    }
}

#[cfg(not(unix))]
fn kill_group(_leader: u32) {}

/// Run a compiled test binary.
///
/// Never fails: a missing binary, a spawn failure, a timeout and lost output are all outcomes the
/// classifier maps to a skip.
#[tracing::instrument(skip_all, fields(binary = %binary.display()))]
pub fn run_binary(binary: &Path, timeout: Duration) -> RunOutcome {
    if !binary.is_file() {
        return RunOutcome::Missing;
    }
    let mut cmd = Command::new(explicit_path(binary));
    match output_with_timeout(&mut cmd, timeout) {
        Ok(Supervised::Exited(result)) => {
            tracing::debug!(code = ?result.code, elapsed = ?result.duration, "binary exited");
            RunOutcome::Completed(result)
        }
        Ok(Supervised::TimedOut) => RunOutcome::TimedOut,
        Ok(Supervised::OutputIncomplete { .. }) => RunOutcome::OutputIncomplete,
        Err(e) if e.kind() == io::ErrorKind::NotFound => RunOutcome::Missing,
        Err(e) => RunOutcome::NotExecutable(e.to_string()),
    }
}

/// Make a bare file name explicit (`add` -> `./add`) so it is not looked up on `PATH`.
pub fn explicit_path(path: &Path) -> PathBuf {
    if path.parent() == Some(Path::new("")) {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}
