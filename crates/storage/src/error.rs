//! Storage error types.

use thiserror::Error;

/// Blob store operation errors.
///
/// Backend failures cross the capability boundary as structured values: a
/// human-readable message plus an optional machine-readable code, never a
/// raw panic or provider exception.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("backend error: {message}")]
    Backend {
        message: String,
        code: Option<String>,
    },
}

impl StorageError {
    /// The machine-readable code, if the backend supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Backend { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
