//! Mapping repository identifiers to their directories on disk.

use std::path::{Path, PathBuf};

/// The directory below the git root holding all repositories.
pub const DEFAULT_REPOS_SUBDIR: &str = "repos";
/// The extension of each repository directory.
pub const DEFAULT_REPO_SUFFIX: &str = "git";

/// A repository resolved for the duration of a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    /// The opaque identifier the caller addressed the repository by.
    pub uid: String,
    /// The directory of the (bare) repository.
    pub path: PathBuf,
}

/// The root directory all repositories live in.
///
/// The root is created once when constructing this type. Resolution afterwards is pure:
/// it neither touches the filesystem nor checks that the repository exists, as creating
/// repositories is someone else's business.
#[derive(Debug, Clone)]
pub struct RepositoryRoot {
    root: PathBuf,
    suffix: String,
}

impl RepositoryRoot {
    /// Use `<git_root>/<repos_subdir>` as root, creating it with owner-only permissions if
    /// it doesn't exist yet.
    pub fn new(
        git_root: impl AsRef<Path>,
        repos_subdir: impl AsRef<Path>,
        suffix: impl Into<String>,
    ) -> std::io::Result<Self> {
        let root = git_root.as_ref().join(repos_subdir);
        if !root.is_dir() {
            create_private_dir(&root)?;
            tracing::debug!(root = %root.display(), "created repository root");
        }
        Ok(Self {
            root,
            suffix: suffix.into(),
        })
    }

    /// Like [`new()`](Self::new()), with the default sub-directory and suffix.
    pub fn with_defaults(git_root: impl AsRef<Path>) -> std::io::Result<Self> {
        Self::new(git_root, DEFAULT_REPOS_SUBDIR, DEFAULT_REPO_SUFFIX)
    }

    /// The directory all repositories are placed in.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Return the handle of the repository identified by `uid`, located at `<root>/<uid>.<suffix>`.
    pub fn resolve(&self, uid: &str) -> RepositoryHandle {
        RepositoryHandle {
            uid: uid.to_owned(),
            path: self.root.join(format!("{uid}.{}", self.suffix)),
        }
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}
