#![deny(rust_2018_idioms, unsafe_code)]

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gix_smart_http::{CancellationToken, InfoRefsRequest, Options, Service, ServicePackRequest};

/// Serve git's smart protocol with stdin and stdout as transport.
#[derive(Debug, clap::Parser)]
#[clap(name = "gix-serve-rpc", about, version = clap::crate_version!())]
struct Args {
    /// The directory holding the repository root.
    #[clap(long, env = "GIX_SERVE_GIT_ROOT")]
    git_root: PathBuf,

    /// The `git` executable to run.
    #[clap(long, default_value = "git")]
    git: OsString,

    /// Seconds a ref advertisement may take.
    #[clap(long, default_value_t = 60)]
    advertise_timeout: u64,

    /// Log more, up to three times.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    cmd: Subcommands,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommands {
    /// Write the ref advertisement of a repository to stdout.
    InfoRefs {
        /// The repository to advertise.
        repo_uid: String,
        /// `upload-pack` or `receive-pack`.
        service: String,
        /// The protocol header sent by the client.
        #[clap(long)]
        git_protocol: Option<String>,
    },
    /// Relay a request body from stdin to `git` and its response to stdout.
    ServicePack {
        /// The repository to operate on.
        repo_uid: String,
        /// `upload-pack` or `receive-pack`.
        service: String,
        /// The protocol header sent by the client.
        #[clap(long)]
        git_protocol: Option<String>,
        /// The principal performing a push.
        #[clap(long)]
        principal: Option<String>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let invalid = err
                .downcast_ref::<gix_smart_http::Error>()
                .is_some_and(gix_smart_http::Error::is_client_error);
            ExitCode::from(if invalid { 2 } else { 1 })
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .init();
}

fn run(args: Args) -> anyhow::Result<()> {
    let options = Options::new(&args.git_root)
        .with_git_program(args.git)
        .with_advertise_timeout(Duration::from_secs(args.advertise_timeout));
    let chunk_size = options.chunk_size;
    let service = Service::new(options)
        .with_context(|| format!("Could not create the repository root below {:?}", args.git_root))?;

    match args.cmd {
        Subcommands::InfoRefs {
            repo_uid,
            service: name,
            git_protocol,
        } => service.info_refs(
            &InfoRefsRequest {
                repo_uid,
                service: name,
                git_protocol,
            },
            send_to_stdout,
        )?,
        Subcommands::ServicePack {
            repo_uid,
            service: name,
            git_protocol,
            principal,
        } => {
            let mut metadata = Some(ServicePackRequest {
                repo_uid,
                service: name,
                git_protocol,
                principal_id: principal,
                data: Vec::new(),
            });
            let mut stdin = io::stdin();
            let requests = move || -> io::Result<Option<ServicePackRequest>> {
                if let Some(metadata) = metadata.take() {
                    return Ok(Some(metadata));
                }
                let mut buf = vec![0; chunk_size];
                let n = stdin.read(&mut buf)?;
                buf.truncate(n);
                Ok((n != 0).then(|| ServicePackRequest::with_data(buf)))
            };
            service.service_pack(&CancellationToken::new(), requests, send_to_stdout)?;
        }
    }
    Ok(())
}

fn send_to_stdout(chunk: &[u8]) -> io::Result<()> {
    let mut out = io::stdout();
    out.write_all(chunk)?;
    out.flush()
}
