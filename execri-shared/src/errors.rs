//! Error types shared by every execri component.
//!
//! Each variant maps onto exactly one gRPC status code so callers of the
//! runtime interface can tell a missing entity from an executor failure.

use thiserror::Error;
use tonic::{Code, Status};

/// Result alias used across the workspace.
pub type ExecriResult<T> = Result<T, ExecriError>;

/// Errors surfaced by the runtime and image services.
#[derive(Debug, Error)]
pub enum ExecriError {
    /// A sandbox or container ID is absent from its registry.
    #[error("{0} not found")]
    NotFound(String),

    /// A precondition outside the registries does not hold (e.g. image path missing).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A required request field is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An external executor command exited non-zero or could not be spawned.
    #[error("executor: {0}")]
    Executor(String),

    /// Filesystem or socket failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid option value.
    #[error("config: {0}")]
    Config(String),

    /// gRPC transport failure.
    #[error("transport: {0}")]
    Transport(String),
}

impl ExecriError {
    /// gRPC status code for this error.
    pub fn code(&self) -> Code {
        match self {
            ExecriError::NotFound(_) => Code::NotFound,
            ExecriError::Precondition(_) => Code::FailedPrecondition,
            ExecriError::InvalidArgument(_) | ExecriError::Config(_) => Code::InvalidArgument,
            ExecriError::Executor(_) => Code::Unknown,
            ExecriError::Io(_) => Code::Internal,
            ExecriError::Transport(_) => Code::Unavailable,
        }
    }
}

impl From<ExecriError> for Status {
    fn from(err: ExecriError) -> Self {
        Status::new(err.code(), err.to_string())
    }
}

impl From<tonic::transport::Error> for ExecriError {
    fn from(err: tonic::transport::Error) -> Self {
        ExecriError::Transport(err.to_string())
    }
}
