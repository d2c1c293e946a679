//! Upload coordination error types.

use hoist_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the upload coordinator.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The active session cap is reached and no new session can open.
    #[error("upload session capacity exceeded ({max} active sessions)")]
    CapacityExceeded { max: usize },

    /// A staging, merge, or checksum I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Completion was requested before every chunk arrived. The session is
    /// kept alive so the caller can resend the missing chunks.
    #[error("upload incomplete: expected {expected} chunks, missing {missing:?}")]
    IncompleteUpload { expected: u32, missing: Vec<u32> },

    /// The named session does not exist (never opened, or already removed).
    #[error("unknown upload session: {0}")]
    SessionNotFound(String),

    /// The blob store rejected the commit. The session is discarded.
    #[error("storage commit failed: {message}")]
    StorageCommitFailed {
        message: String,
        code: Option<String>,
    },

    /// A chunk index of zero, or beyond the declared chunk total.
    #[error("chunk index {index} out of range (declared total {total})")]
    InvalidChunkIndex { index: u32, total: u32 },

    /// A request carried an invalid upload id or malformed field.
    #[error(transparent)]
    Invalid(#[from] hoist_core::Error),

    /// The coordinator is shutting down.
    #[error("operation cancelled")]
    Cancelled,
}

impl UploadError {
    pub(crate) fn from_commit(err: StorageError) -> Self {
        let code = err.code().map(str::to_string);
        Self::StorageCommitFailed {
            message: err.to_string(),
            code,
        }
    }
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, UploadError>;
