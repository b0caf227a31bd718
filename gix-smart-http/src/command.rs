//! Running `git` with its standard streams bound to the transport.
//!
//! Standard input is fed, and standard output and standard error are drained, by threads
//! of their own, while the calling thread supervises the process. The process is always
//! reaped before [`run()`] returns, no matter how it ends.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bstr::ByteSlice;
use gix_serve_core::environment::SubprocessEnvironment;
use gix_serve_core::CancellationToken;

const BUF_SIZE: usize = 64 * 1024;

/// A single invocation of `git`.
pub(crate) struct Invocation<'a> {
    pub program: &'a OsStr,
    pub args: Vec<OsString>,
    pub dir: &'a Path,
    pub env: SubprocessEnvironment,
}

impl Invocation<'_> {
    /// A human-readable rendition for logs.
    pub fn description(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "{} {args} [repo_path: {}]",
            self.program.to_string_lossy(),
            self.dir.display()
        )
    }
}

/// Bounds on a running process.
pub(crate) struct Limits<'a> {
    pub cancellation: Option<&'a CancellationToken>,
    pub deadline: Option<Instant>,
    pub poll_interval: Duration,
    pub max_stderr: usize,
}

/// Why the process stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stop {
    /// It exited on its own.
    Exited,
    /// It was killed as the call was cancelled.
    Cancelled,
    /// It was killed as it ran past its deadline.
    TimedOut,
    /// It was killed as one of its streams failed.
    Aborted,
}

/// A failure moving bytes between the process and the transport.
#[derive(Debug)]
pub(crate) enum StreamError {
    /// The transport failed to send or receive.
    Transport(io::Error),
    /// A pipe to or from the process failed.
    Pipe(io::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Transport(err) => write!(f, "transport: {err}"),
            StreamError::Pipe(err) => write!(f, "pipe: {err}"),
        }
    }
}

/// What happened to a process that could be started.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub status: ExitStatus,
    pub stop: Stop,
    pub stderr: Vec<u8>,
    /// The first stream failure, with those on standard output taking precedence.
    pub stream_error: Option<StreamError>,
}

impl Outcome {
    /// Standard error for display, trimmed.
    pub fn stderr_lossy(&self) -> String {
        self.stderr.trim().to_str_lossy().into_owned()
    }
}

/// Run `invocation`, feeding it `stdin` if given and writing its standard output to `stdout`.
///
/// Only failing to start or to wait for the process is an error; everything else is
/// reported through the [`Outcome`].
pub(crate) fn run(
    invocation: &Invocation<'_>,
    stdin: Option<&mut (dyn Read + Send)>,
    stdout: &mut (dyn Write + Send),
    limits: &Limits<'_>,
) -> io::Result<Outcome> {
    let mut prepare = gix_command::prepare(invocation.program)
        .args(invocation.args.iter().cloned())
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in invocation.env.iter() {
        prepare = prepare.env(key, value);
    }
    let mut cmd: std::process::Command = prepare.into();
    cmd.current_dir(invocation.dir);

    let mut child = cmd.spawn()?;
    tracing::debug!(pid = child.id(), command = %invocation.description(), "spawned");

    let child_stdin = child.stdin.take();
    let (Some(child_stdout), Some(child_stderr)) = (child.stdout.take(), child.stderr.take()) else {
        reap(&mut child);
        return Err(io::Error::new(io::ErrorKind::Other, "standard output and error were not piped"));
    };

    let abort = &AtomicBool::new(false);
    let max_stderr = limits.max_stderr;
    let outcome = std::thread::scope(|scope| {
        let feeder = stdin
            .zip(child_stdin)
            .map(|(input, pipe)| scope.spawn(move || feed(input, pipe, abort)));
        let drainer = scope.spawn(move || drain(child_stdout, stdout, abort));
        let collector = scope.spawn(move || collect(child_stderr, max_stderr));

        let (status, stop) = match supervise(&mut child, limits, abort) {
            Ok(res) => res,
            Err(err) => {
                reap(&mut child);
                return Err(err);
            }
        };

        let stdout_error = drainer.join().unwrap_or_else(|_| Err(panicked()));
        let stdin_error = feeder.map_or(Ok(()), |feeder| feeder.join().unwrap_or_else(|_| Err(panicked())));
        let stderr = collector.join().unwrap_or_default();
        Ok(Outcome {
            status,
            stop,
            stderr,
            stream_error: stdout_error.err().or(stdin_error.err()),
        })
    })?;

    tracing::debug!(status = %outcome.status, stop = ?outcome.stop, "process ended");
    Ok(outcome)
}

fn panicked() -> StreamError {
    StreamError::Pipe(io::Error::new(io::ErrorKind::Other, "stream thread panicked"))
}

/// Wait for `child` to exit, killing it once cancelled, past its deadline, or aborted.
fn supervise(child: &mut Child, limits: &Limits<'_>, abort: &AtomicBool) -> io::Result<(ExitStatus, Stop)> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, Stop::Exited));
        }
        let stop = if limits.cancellation.is_some_and(CancellationToken::is_cancelled) {
            Some(Stop::Cancelled)
        } else if limits.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            Some(Stop::TimedOut)
        } else if abort.load(Ordering::SeqCst) {
            Some(Stop::Aborted)
        } else {
            None
        };
        if let Some(stop) = stop {
            // It may have exited since `try_wait()`, in which case there is nothing left to kill.
            child.kill().ok();
            return Ok((child.wait()?, stop));
        }
        std::thread::sleep(limits.poll_interval);
    }
}

fn reap(child: &mut Child) {
    child.kill().ok();
    child.wait().ok();
}

/// Copy `input` into the process until the transport ends.
///
/// The process closing its end is not an error: it has all it wants.
fn feed(input: &mut (dyn Read + Send), mut pipe: ChildStdin, abort: &AtomicBool) -> Result<(), StreamError> {
    let mut buf = vec![0; BUF_SIZE];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(err) => {
                abort.store(true, Ordering::SeqCst);
                return Err(StreamError::Transport(err));
            }
        };
        match pipe.write_all(&buf[..n]) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
            Err(err) => return Err(StreamError::Pipe(err)),
        }
    }
}

/// Copy the process' standard output to `out` until it closes.
fn drain(mut pipe: ChildStdout, out: &mut (dyn Write + Send), abort: &AtomicBool) -> Result<(), StreamError> {
    let mut buf = vec![0; BUF_SIZE];
    loop {
        let n = match pipe.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(StreamError::Pipe(err)),
        };
        if let Err(err) = out.write_all(&buf[..n]) {
            abort.store(true, Ordering::SeqCst);
            return Err(StreamError::Transport(err));
        }
    }
    out.flush().map_err(StreamError::Transport)
}

/// Keep up to `limit` bytes of standard error, reading the rest to not block the process.
fn collect(mut pipe: ChildStderr, limit: usize) -> Vec<u8> {
    let mut kept = Vec::new();
    let mut buf = [0; 8192];
    loop {
        match pipe.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    kept
}
