use std::io::Read;

use gix_serve_core::environment::EnvironmentBuilder;
use gix_serve_core::stream::{ChunkReader, ChunkWriter};
use gix_serve_core::{CancellationPoint, ServiceKind};

use crate::command::{self, Invocation, Limits, StreamError};
use crate::error::{Error, Result};
use crate::transport::{Payloads, RequestStream};
use crate::{CancellationToken, ChunkSink, Service};

const OPERATION: &str = "ServicePack";

impl Service {
    /// Run a fetch or push, relaying `requests` to `git <service> --stateless-rpc` and its
    /// output to `responses` as it is produced.
    ///
    /// The first message of `requests` must carry the metadata and no data, and every following
    /// one only data. Nothing is started if the metadata is missing or malformed.
    ///
    /// Once `cancellation` is cancelled `git` is killed and [`Error::Cancelled`] is returned.
    /// `requests` is expected to wake up a pending receive when that happens.
    pub fn service_pack(
        &self,
        cancellation: &CancellationToken,
        mut requests: impl RequestStream + Send,
        responses: impl ChunkSink + Send,
    ) -> Result<()> {
        let metadata = requests
            .recv()?
            .ok_or_else(|| Error::invalid_argument(OPERATION, "stream ended before the request metadata"))?;
        if !metadata.data.is_empty() {
            return Err(Error::invalid_argument(OPERATION, "non-empty Data"));
        }
        if metadata.repo_uid.is_empty() {
            return Err(Error::invalid_argument(OPERATION, "repository UID is missing"));
        }
        let service: ServiceKind = metadata
            .service
            .parse()
            .map_err(|err: gix_serve_core::Error| Error::invalid_argument(OPERATION, err.to_string()))?;

        let _span = tracing::info_span!(
            "service_pack",
            repo_uid = %metadata.repo_uid,
            service = %service
        )
        .entered();

        let repo = self.repository(&metadata.repo_uid);
        if cancellation.check().is_err() {
            tracing::debug!("call was cancelled before git was started");
            return Err(Error::Cancelled {
                operation: OPERATION,
                repo_uid: repo.uid,
            });
        }
        let invocation = Invocation {
            program: &self.options.git_program,
            args: vec![service.as_str().into(), "--stateless-rpc".into(), repo.path.clone().into()],
            dir: &repo.path,
            env: EnvironmentBuilder::new(service, &metadata.repo_uid)
                .with_protocol(metadata.git_protocol)
                .with_principal(metadata.principal_id)
                .build(),
        };

        let mut stdin = ChunkReader::new(Payloads(requests)).with_cancellation(cancellation.clone());
        let mut stdout = ChunkWriter::new(responses);
        let outcome = command::run(
            &invocation,
            Some(&mut stdin as &mut (dyn Read + Send)),
            &mut stdout,
            &Limits {
                cancellation: Some(cancellation),
                deadline: None,
                poll_interval: self.options.poll_interval,
                max_stderr: self.options.max_stderr,
            },
        )
        .map_err(|err| {
            tracing::error!(
                command = %invocation.description(),
                repo_path = %repo.path.display(),
                %err,
                "failed to start git"
            );
            Error::internal(OPERATION, &repo.uid, err.to_string())
        })?;

        let cancelled = outcome.stop == command::Stop::Cancelled
            || (cancellation.is_cancelled() && (outcome.stream_error.is_some() || !outcome.status.success()));
        if cancelled {
            tracing::debug!(command = %invocation.description(), "call was cancelled, git was terminated");
            return Err(Error::Cancelled {
                operation: OPERATION,
                repo_uid: repo.uid,
            });
        }
        if let Some(StreamError::Transport(err)) = outcome.stream_error {
            return Err(Error::Transport(err));
        }
        if !outcome.status.success() {
            tracing::error!(
                command = %invocation.description(),
                repo_path = %repo.path.display(),
                status = %outcome.status,
                stderr = %outcome.stderr_lossy(),
                "failed to serve RPC({service})"
            );
            return Err(Error::internal(OPERATION, &repo.uid, outcome.status.to_string()));
        }
        if let Some(err) = outcome.stream_error {
            tracing::error!(command = %invocation.description(), %err, "failed to relay the exchange");
            return Err(Error::internal(OPERATION, &repo.uid, err.to_string()));
        }
        tracing::debug!("exchange completed");
        Ok(())
    }
}
