//! Configuration of the smart-HTTP service

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use gix_serve_core::repository::{DEFAULT_REPOS_SUBDIR, DEFAULT_REPO_SUFFIX};

/// Configuration options for the smart-HTTP service
#[derive(Debug, Clone)]
pub struct Options {
    /// The directory holding the repository root.
    pub git_root: PathBuf,

    /// The directory below `git_root` containing all repositories.
    pub repos_subdir: PathBuf,

    /// The extension of each repository directory.
    pub repo_suffix: String,

    /// The `git` executable to run.
    pub git_program: OsString,

    /// How long a ref advertisement may take, independently of the caller's deadline.
    pub advertise_timeout: Duration,

    /// How often a running subprocess is checked for exit, cancellation and timeouts.
    pub poll_interval: Duration,

    /// The largest chunk sent for a buffered ref advertisement.
    pub chunk_size: usize,

    /// The most bytes of standard error kept for diagnosing a failure.
    pub max_stderr: usize,
}

impl Options {
    /// Create options for repositories below `git_root`, with defaults for everything else.
    pub fn new(git_root: impl Into<PathBuf>) -> Self {
        Self {
            git_root: git_root.into(),
            repos_subdir: DEFAULT_REPOS_SUBDIR.into(),
            repo_suffix: DEFAULT_REPO_SUFFIX.into(),
            git_program: "git".into(),
            advertise_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(10),
            chunk_size: 32 * 1024,
            max_stderr: 1024 * 1024,
        }
    }

    /// Set the directory below the git root containing all repositories.
    pub fn with_repos_subdir(mut self, subdir: impl Into<PathBuf>) -> Self {
        self.repos_subdir = subdir.into();
        self
    }

    /// Set the extension of repository directories.
    pub fn with_repo_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.repo_suffix = suffix.into();
        self
    }

    /// Set the `git` executable to run.
    pub fn with_git_program(mut self, program: impl Into<OsString>) -> Self {
        self.git_program = program.into();
        self
    }

    /// Set the time limit of ref advertisements.
    pub fn with_advertise_timeout(mut self, timeout: Duration) -> Self {
        self.advertise_timeout = timeout;
        self
    }

    /// Set how often running subprocesses are checked.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the largest chunk sent for ref advertisements. Zero is treated as one.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Set how much of standard error is kept.
    pub fn with_max_stderr(mut self, bytes: usize) -> Self {
        self.max_stderr = bytes;
        self
    }
}
