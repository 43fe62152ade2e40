//! Toolchain error types

use std::path::PathBuf;

use blockforge_types::ErrorRecord;
use thiserror::Error;

/// Workspace lifecycle errors
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// `path()` called before `create()` or after `cleanup()`
    #[error("workspace not ready")]
    NotReady,

    /// Directory could not be allocated or removed
    #[error("workspace resource error at {path}: {source}")]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from running an external compiler
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The compiler ran and reported failure (non-zero exit or error
    /// diagnostics)
    #[error("{message}")]
    Failed { message: String, stderr: String },

    /// Compiler output could not be understood
    #[error("unparsable compiler output: {0}")]
    Parse(String),

    /// Wall-clock budget exceeded, in seconds
    #[error("compilation timed out after {0}s")]
    Timeout(u64),

    /// The compiler binary could not be started
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Workspace allocation failure
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Filesystem failure while preparing inputs or collecting outputs
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolchainError {
    pub fn failed(message: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether the cause lies with the host rather than the submitted source.
    pub fn is_infra(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }

    /// Terminal job error for this failure.
    ///
    /// Compiler failures carry their diagnostics; infra failures are reduced
    /// to the generic message.
    pub fn to_record(&self) -> ErrorRecord {
        match self {
            Self::Failed { message, stderr } => ErrorRecord::toolchain(message.clone(), stderr.clone()),
            Self::Parse(detail) => ErrorRecord::toolchain("unparsable compiler output", detail.clone()),
            Self::Timeout(secs) => ErrorRecord::timeout(*secs),
            Self::Workspace(e) => ErrorRecord::resource(e.to_string()),
            Self::Io(e) => ErrorRecord::resource(format!("workspace io error: {}", e)),
            Self::Spawn { .. } => ErrorRecord::infra(),
        }
    }
}

/// Result type for workspace operations
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Result type for toolchain operations
pub type ToolchainResult<T> = Result<T, ToolchainError>;
