//! Blob descriptors and upload options for the storage capability.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Metadata returned by the blob store after a successful upload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlobDescriptor {
    /// The blob's file name.
    pub name: String,
    /// Full backend key, including any directory prefix.
    pub full_name: String,
    /// Size in bytes.
    pub length: u64,
    /// Content type, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Last modification time, if the backend reports one.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
    /// Free-form metadata attached at upload time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Options for storing one blob.
#[derive(Clone, Debug, Default)]
pub struct UploadOptions {
    /// File name to store the blob under.
    pub file_name: String,
    /// Directory (backend key prefix) for the blob.
    pub directory: Option<String>,
    /// Content type to record.
    pub content_type: Option<String>,
    /// Free-form metadata to attach.
    pub metadata: BTreeMap<String, String>,
}

impl UploadOptions {
    /// Create options for a bare file name.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    /// The full backend key: `directory/file_name`, or just the file name.
    pub fn full_name(&self) -> String {
        match self.directory.as_deref() {
            Some(dir) if !dir.is_empty() => {
                format!("{}/{}", dir.trim_end_matches('/'), self.file_name)
            }
            _ => self.file_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_joins_directory() {
        let mut options = UploadOptions::new("report.bin");
        assert_eq!(options.full_name(), "report.bin");

        options.directory = Some("uploads/2026".to_string());
        assert_eq!(options.full_name(), "uploads/2026/report.bin");

        options.directory = Some("uploads/".to_string());
        assert_eq!(options.full_name(), "uploads/report.bin");

        options.directory = Some(String::new());
        assert_eq!(options.full_name(), "report.bin");
    }

    #[test]
    fn test_blob_descriptor_serde_roundtrip() {
        let descriptor = BlobDescriptor {
            name: "report.bin".to_string(),
            full_name: "uploads/report.bin".to_string(),
            length: 5120,
            content_type: Some("application/octet-stream".to_string()),
            last_modified: Some(OffsetDateTime::UNIX_EPOCH),
            metadata: BTreeMap::from([("owner".to_string(), "tests".to_string())]),
        };

        let json = serde_json::to_string(&descriptor).unwrap();
        let decoded: BlobDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.full_name, "uploads/report.bin");
        assert_eq!(decoded.length, 5120);
        assert_eq!(decoded.metadata.get("owner").map(String::as_str), Some("tests"));
    }
}
