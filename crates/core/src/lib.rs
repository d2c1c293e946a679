//! Core domain types and shared logic for the hoist upload coordinator.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Upload ids and session lifecycle
//! - Chunk submission and completion request/result shapes
//! - Blob descriptors returned by the storage capability
//! - Configuration types

pub mod blob;
pub mod config;
pub mod error;
pub mod upload;

pub use blob::{BlobDescriptor, UploadOptions};
pub use config::{CoordinatorConfig, StorageConfig};
pub use error::{Error, Result};
pub use upload::{ChunkSubmission, CompletionRequest, CompletionResult, SessionPhase, UploadId};

/// Buffer size for streaming file I/O (64 KiB).
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Maximum length of a caller-supplied upload id, in bytes.
pub const MAX_UPLOAD_ID_LEN: usize = 128;
