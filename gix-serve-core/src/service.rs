//! The error type shared by the primitives in this crate.

/// The error type used by the primitives in this crate.
///
/// Keep this minimal in core. The dispatcher maps it into its own,
/// transport-facing error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A generic I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Protocol-level error, e.g. a packet-line that can't be framed.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Input validation error.
    #[error("validation error: {0}")]
    Validation(String),
    /// The operation was cancelled by its caller.
    #[error("operation cancelled")]
    Cancelled,
}
