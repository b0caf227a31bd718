//! Shared fixtures: stub `git` executables, real repositories and an error-event counter.
#![allow(dead_code)]

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use gix_smart_http::{CancellationToken, Options, Service, ServicePackRequest};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

pub type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

/// A service below a fresh temporary directory.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub service: Service,
}

impl Fixture {
    /// Use the system `git`.
    pub fn new() -> Result<Self> {
        Self::with_options(|opts| opts)
    }

    /// Run `script` as `git`. It sees the same arguments `git` would.
    pub fn with_stub(script: &str) -> Result<Self> {
        Self::with_stub_and_options(script, |opts| opts)
    }

    /// Like [`with_stub()`](Self::with_stub()), with `adjust` applied to the options last.
    pub fn with_stub_and_options(script: &str, adjust: impl FnOnce(Options) -> Options) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let stub = write_script(dir.path(), "git-stub", script)?;
        let service = Service::new(adjust(
            Options::new(dir.path().join("root"))
                .with_git_program(stub)
                .with_poll_interval(Duration::from_millis(5)),
        ))?;
        Ok(Self { dir, service })
    }

    pub fn with_options(adjust: impl FnOnce(Options) -> Options) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let service = Service::new(adjust(Options::new(dir.path().join("root"))))?;
        Ok(Self { dir, service })
    }

    /// Create an empty directory where the repository `uid` is expected.
    pub fn repo_dir(&self, uid: &str) -> Result<PathBuf> {
        let path = self.service.repository(uid).path;
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Initialize a bare repository for `uid`.
    pub fn bare_repo(&self, uid: &str) -> Result<PathBuf> {
        let path = self.service.repository(uid).path;
        git(self.dir.path(), &["init", "--bare", "--quiet", path.to_str().ok_or("non-utf8 path")?])?;
        Ok(path)
    }

    /// A file next to the repositories for stubs to leave traces in.
    pub fn marker(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Write an executable shell script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Run `git` with `args` in `dir` and return its standard output.
pub fn git(dir: &Path, args: &[&str]) -> Result<Vec<u8>> {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()?;
    if !out.status.success() {
        return Err(format!(
            "git {args:?} failed with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr)
        )
        .into());
    }
    Ok(out.stdout)
}

/// The metadata message opening an exchange.
pub fn metadata(repo_uid: &str, service: &str) -> ServicePackRequest {
    ServicePackRequest {
        repo_uid: repo_uid.into(),
        service: service.into(),
        ..Default::default()
    }
}

/// A request stream yielding `messages`, then the end of the stream.
pub fn requests(
    messages: Vec<ServicePackRequest>,
) -> impl FnMut() -> io::Result<Option<ServicePackRequest>> + Send {
    let mut messages = messages.into_iter();
    move || Ok(messages.next())
}

/// A request stream receiving from `rx` that wakes up to fail once `token` is cancelled,
/// as transports with a cancellable call context do.
pub fn channel_requests(
    rx: Receiver<ServicePackRequest>,
    token: CancellationToken,
) -> impl FnMut() -> io::Result<Option<ServicePackRequest>> + Send {
    move || loop {
        if token.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Other, "context canceled"));
        }
        match rx.recv_timeout(Duration::from_millis(10)) {
            Ok(msg) => return Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(None),
        }
    }
}

/// Counts events at `ERROR` level.
#[derive(Clone, Default)]
pub struct ErrorEvents(Arc<AtomicUsize>);

impl ErrorEvents {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> Layer<S> for ErrorEvents {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Run `f` and return its result along with the number of error events it recorded on
/// this thread.
pub fn count_errors<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let events = ErrorEvents::default();
    let subscriber = tracing_subscriber::registry().with(events.clone());
    let res = tracing::subscriber::with_default(subscriber, f);
    (res, events.count())
}
