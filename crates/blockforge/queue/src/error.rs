//! Error types for the job queue

use blockforge_types::{BlockError, ErrorCode, InvalidTransition, JobId};
use thiserror::Error;

/// Job and artifact store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this id
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// Compare-and-set rejected: the job is not in a state that allows the
    /// requested transition
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// Record already exists
    #[error("job already exists: {0}")]
    Duplicate(JobId),

    /// Backing file I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Queue-level errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Malformed or missing submission fields
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Source rejected by the static gate
    #[error("{message}")]
    Validation { code: ErrorCode, message: String },

    /// The submission channel has no free slot
    #[error("job queue is full")]
    Full,

    /// The queue no longer accepts work
    #[error("job queue is shut down")]
    Closed,

    /// `start` called twice
    #[error("worker pool already started")]
    AlreadyStarted,

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueueError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::Validation { code, .. } => *code,
            Self::Full | Self::Closed | Self::AlreadyStarted | Self::Store(_) => {
                ErrorCode::InfraError
            }
        }
    }
}

impl From<BlockError> for QueueError {
    fn from(err: BlockError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
