//! Error types for the smart-HTTP operations

/// Result type alias for smart-HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// The status reported to the caller of an RPC, mirroring the codes of common RPC frameworks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// The request was malformed. Retrying it unchanged won't help.
    InvalidArgument,
    /// Running `git` failed.
    Internal,
    /// The caller cancelled the call.
    Cancelled,
    /// The transport failed to deliver or receive a message.
    Unavailable,
}

/// Error type for the smart-HTTP operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request was malformed and no subprocess was started.
    #[error("{operation}(): {message}")]
    InvalidArgument {
        /// The operation that refused the request.
        operation: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// `git` could not be started, failed, or ran out of time.
    #[error("{operation}(): {message} [repo_uid: {repo_uid}]")]
    Internal {
        /// The failing operation.
        operation: &'static str,
        /// The repository the operation was running against.
        repo_uid: String,
        /// The underlying failure.
        message: String,
    },

    /// The caller cancelled the call and `git` was terminated.
    #[error("{operation}(): call was cancelled [repo_uid: {repo_uid}]")]
    Cancelled {
        /// The cancelled operation.
        operation: &'static str,
        /// The repository the operation was running against.
        repo_uid: String,
    },

    /// Sending or receiving a message failed, passed on as reported by the transport.
    #[error(transparent)]
    Transport(#[from] std::io::Error),
}

impl Error {
    /// The status code to report to the caller.
    pub fn code(&self) -> Code {
        match self {
            Error::InvalidArgument { .. } => Code::InvalidArgument,
            Error::Internal { .. } => Code::Internal,
            Error::Cancelled { .. } => Code::Cancelled,
            Error::Transport(_) => Code::Unavailable,
        }
    }

    /// Check if this error was caused by the request itself
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }

    pub(crate) fn invalid_argument(operation: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn internal(operation: &'static str, repo_uid: &str, message: impl Into<String>) -> Self {
        Error::Internal {
            operation,
            repo_uid: repo_uid.to_owned(),
            message: message.into(),
        }
    }
}
