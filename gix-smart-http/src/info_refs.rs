use std::time::Instant;

use gix_serve_core::environment::SubprocessEnvironment;
use gix_serve_core::{pktline, ServiceKind};

use crate::command::{self, Invocation, Limits, Stop};
use crate::error::{Error, Result};
use crate::transport::InfoRefsRequest;
use crate::{ChunkSink, Service};

const OPERATION: &str = "InfoRefs";

impl Service {
    /// Advertise the refs of the repository named in `request` to `sink`.
    ///
    /// `git <service> --stateless-rpc --advertise-refs` runs to completion before anything is
    /// sent, bounded by [`Options::advertise_timeout`](crate::Options::advertise_timeout).
    /// On success `sink` receives the `# service=git-<service>` preface and a flush packet,
    /// followed by the output of `git` in chunks of at most
    /// [`Options::chunk_size`](crate::Options::chunk_size) bytes. On failure it receives nothing.
    pub fn info_refs(&self, request: &InfoRefsRequest, mut sink: impl ChunkSink) -> Result<()> {
        let service: ServiceKind = request
            .service
            .parse()
            .map_err(|err: gix_serve_core::Error| Error::invalid_argument(OPERATION, err.to_string()))?;

        let _span =
            tracing::info_span!("info_refs", repo_uid = %request.repo_uid, service = %service).entered();

        let repo = self.repository(&request.repo_uid);
        let invocation = Invocation {
            program: &self.options.git_program,
            args: vec![
                service.as_str().into(),
                "--stateless-rpc".into(),
                "--advertise-refs".into(),
                ".".into(),
            ],
            dir: &repo.path,
            env: SubprocessEnvironment::for_advertisement(request.git_protocol.as_deref()),
        };

        let mut refs = Vec::new();
        let outcome = command::run(
            &invocation,
            None,
            &mut refs,
            &Limits {
                cancellation: None,
                deadline: Some(Instant::now() + self.options.advertise_timeout),
                poll_interval: self.options.poll_interval,
                max_stderr: self.options.max_stderr,
            },
        )
        .map_err(|err| {
            tracing::error!(command = %invocation.description(), %err, "failed to start git");
            Error::internal(OPERATION, &repo.uid, format!("cmd: {err}"))
        })?;

        let failure = match outcome.stop {
            Stop::TimedOut => Some(format!(
                "cmd: timed out after {:?}",
                self.options.advertise_timeout
            )),
            _ if !outcome.status.success() => Some(format!("cmd: {}", outcome.status)),
            _ => outcome
                .stream_error
                .as_ref()
                .map(|err| format!("cmd: failed to read output: {err}")),
        };
        if let Some(message) = failure {
            tracing::error!(
                command = %invocation.description(),
                status = %outcome.status,
                stderr = %outcome.stderr_lossy(),
                "failed to advertise refs"
            );
            return Err(Error::internal(OPERATION, &repo.uid, message));
        }

        let preface = pktline::service_preface(service)
            .map_err(|err| Error::internal(OPERATION, &repo.uid, format!("pktLine: {err}")))?;
        sink.send(&preface)?;
        for chunk in refs.chunks(self.options.chunk_size.max(1)) {
            sink.send(chunk)?;
        }
        tracing::debug!(bytes = refs.len(), "advertised refs");
        Ok(())
    }
}
