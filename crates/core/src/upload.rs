//! Upload session types and lifecycle.

use crate::MAX_UPLOAD_ID_LEN;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Caller-supplied unique identifier for an upload session.
///
/// The id names the session's private staging directory, so it is restricted
/// to a filesystem-safe alphabet: `[A-Za-z0-9._-]`, non-empty, at most
/// [`MAX_UPLOAD_ID_LEN`] bytes, and never starting with a dot.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UploadId(String);

impl UploadId {
    /// Parse and validate a caller-supplied upload id.
    pub fn parse(s: &str) -> crate::Result<Self> {
        if s.is_empty() {
            return Err(crate::Error::InvalidUploadId("id is empty".to_string()));
        }
        if s.len() > MAX_UPLOAD_ID_LEN {
            return Err(crate::Error::InvalidUploadId(format!(
                "id is {} bytes, maximum is {}",
                s.len(),
                MAX_UPLOAD_ID_LEN
            )));
        }
        if s.starts_with('.') {
            return Err(crate::Error::InvalidUploadId(
                "id must not start with a dot".to_string(),
            ));
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(crate::Error::InvalidUploadId(format!(
                "id contains unsupported character {c:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UploadId {
    type Error = crate::Error;

    fn try_from(s: String) -> crate::Result<Self> {
        Self::parse(&s)
    }
}

impl From<UploadId> for String {
    fn from(id: UploadId) -> Self {
        id.0
    }
}

impl fmt::Debug for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UploadId({})", self.0)
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upload session lifecycle phase.
///
/// `Accumulating` is the only phase that accepts chunks; the three
/// right-hand phases are terminal and remove the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Session is open and accepting chunks.
    Accumulating,
    /// Session was successfully completed.
    Completed,
    /// Session was explicitly aborted.
    Aborted,
    /// Session idled past its TTL and was evicted.
    Expired,
}

impl SessionPhase {
    /// Check if the session can still receive chunks.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Accumulating)
    }

    /// Check if the session reached a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Expired)
    }
}

/// One chunk of an in-progress upload, as handed over by the transport.
///
/// Transient: not retained beyond being written to staging as the artifact
/// for `index`.
#[derive(Clone, Debug)]
pub struct ChunkSubmission {
    /// The upload session this chunk belongs to.
    pub upload_id: UploadId,
    /// 1-based ordinal position of this chunk in the file.
    pub index: u32,
    /// Total number of chunks, if the sender declares it.
    pub total_chunks: Option<u32>,
    /// Original file name, if the sender supplies it.
    pub file_name: Option<String>,
    /// MIME content type, if the sender supplies it.
    pub content_type: Option<String>,
    /// Total file size hint in bytes, if the sender supplies it.
    pub file_size: Option<u64>,
    /// The chunk's bytes.
    pub payload: Bytes,
}

/// Request to complete an upload session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The upload session to complete.
    pub upload_id: UploadId,
    /// Name to store the reassembled file under (defaults to the upload id).
    #[serde(default)]
    pub file_name: Option<String>,
    /// Directory within the blob store.
    #[serde(default)]
    pub directory: Option<String>,
    /// Content type to record on the stored blob.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Free-form metadata to attach to the stored blob.
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
    /// Whether to commit the reassembled file to the blob store.
    #[serde(default = "default_true")]
    pub commit_to_storage: bool,
    /// Whether to keep the merged file on local disk after completion.
    #[serde(default)]
    pub keep_merged_file: bool,
}

fn default_true() -> bool {
    true
}

impl CompletionRequest {
    /// Create a request with default options for the given session.
    pub fn new(upload_id: UploadId) -> Self {
        Self {
            upload_id,
            file_name: None,
            directory: None,
            content_type: None,
            metadata: None,
            commit_to_storage: true,
            keep_merged_file: false,
        }
    }
}

/// Result of completing an upload session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletionResult {
    /// CRC-32 of the reassembled file's bytes.
    pub checksum: u32,
    /// Descriptor of the committed blob; present only when the request asked
    /// for a storage commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<crate::BlobDescriptor>,
    /// Where the reassembled file was kept on local disk; present only when
    /// the request set `keep_merged_file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_file: Option<std::path::PathBuf>,
}
