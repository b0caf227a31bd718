//! Serve git's smart protocol over a streaming RPC transport by running `git <service> --stateless-rpc`.
//!
//! A [`Service`] answers two calls:
//!
//! - [`Service::info_refs()`] advertises the refs of a repository, preceded by the
//!   `# service=git-<service>` preface smart-HTTP clients expect.
//! - [`Service::service_pack()`] runs a fetch or push, relaying the request body to `git`
//!   and its response back to the caller while both are still in flight.
//!
//! Transports are plugged in through [`RequestStream`] and [`ChunkSink`], both of which are
//! implemented for closures.
#![deny(missing_docs, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod command;
mod config;
mod error;
mod info_refs;
mod service_pack;
///
pub mod transport;

use std::path::Path;

pub use config::Options;
pub use error::{Code, Error, Result};
pub use gix_serve_core::stream::ChunkSink;
pub use gix_serve_core::repository::RepositoryHandle;
use gix_serve_core::repository::RepositoryRoot;
pub use gix_serve_core::CancellationToken;
pub use transport::{InfoRefsRequest, RequestStream, ServicePackRequest};

/// The smart-HTTP service, answering calls for all repositories below one root.
///
/// It holds no per-call state and can serve any number of calls concurrently.
#[derive(Debug, Clone)]
pub struct Service {
    options: Options,
    root: RepositoryRoot,
}

impl Service {
    /// Create a new service, creating the repository root if it doesn't exist yet.
    pub fn new(options: Options) -> std::io::Result<Self> {
        let root = RepositoryRoot::new(&options.git_root, &options.repos_subdir, options.repo_suffix.clone())?;
        Ok(Self { options, root })
    }

    /// The options the service was created with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The directory all repositories live in.
    pub fn repository_root(&self) -> &Path {
        self.root.path()
    }

    /// Resolve the repository identified by `uid`, without checking that it exists.
    pub fn repository(&self, uid: &str) -> RepositoryHandle {
        self.root.resolve(uid)
    }
}
