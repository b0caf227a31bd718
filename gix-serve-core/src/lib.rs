//! gix-serve-core: Shared server-side primitives for bridging git services to an RPC transport.
//!
//! This crate provides the leaf building blocks used by `gix-smart-http`:
//! packet-line framing for advertisement prefaces, chunk-stream adapters turning
//! a transport's send/receive calls into `Read`/`Write`, repository path
//! resolution, and the environment handed to `git` and its hooks.
//!
//! ## Feature Flags
#![cfg_attr(
    all(doc, feature = "document-features"),
    doc = ::document_features::document_features!()
)]
#![cfg_attr(all(doc, feature = "document-features"), feature(doc_cfg))]
#![deny(missing_docs, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod environment;
pub mod hook;
pub mod interrupt;
pub mod pktline;
pub mod protocol;
pub mod repository;
pub mod service;
pub mod stream;

pub use interrupt::{CancellationPoint, CancellationToken};
pub use protocol::ServiceKind;
pub use service::Error;
