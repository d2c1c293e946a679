//! Chunk reassembly into a single merged file.

use crate::error::{Result, UploadError};
use crate::session::UploadSession;
use hoist_core::COPY_BUFFER_SIZE;
use std::collections::BTreeSet;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Reassemble a session's staged chunks into `merged_path`, in index order.
///
/// The expected chunk count is the declared total when one was given,
/// widened to the highest staged index; the index set must then cover
/// `1..=expected` exactly. A gap fails with [`UploadError::IncompleteUpload`]
/// naming every missing index, and leaves the staging directory untouched so
/// the caller can resend just those chunks.
///
/// Returns the merged file's length in bytes.
pub(crate) async fn merge_chunks(
    session: &UploadSession,
    declared_total: Option<u32>,
    merged_path: &Path,
    cancel: &CancellationToken,
) -> Result<u64> {
    let staged = staged_indices(session).await?;

    let max_staged = staged.iter().next_back().copied().unwrap_or(0);
    let expected = declared_total.map_or(max_staged, |t| t.max(max_staged));
    let missing: Vec<u32> = (1..=expected).filter(|i| !staged.contains(i)).collect();
    if expected == 0 || !missing.is_empty() {
        return Err(UploadError::IncompleteUpload { expected, missing });
    }

    // Concatenate into a temp file, then rename: the merged artifact is
    // either complete or absent.
    let temp_path = merged_path.with_extension(format!("tmp.{}", Uuid::new_v4()));
    let merge_result: Result<u64> = async {
        let mut out = fs::File::create(&temp_path).await?;
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut length: u64 = 0;
        for index in 1..=expected {
            let mut chunk = fs::File::open(session.chunk_path(index)).await?;
            loop {
                if cancel.is_cancelled() {
                    return Err(UploadError::Cancelled);
                }
                let n = chunk.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                out.write_all(&buf[..n]).await?;
                length += n as u64;
            }
        }
        out.sync_all().await?;
        Ok(length)
    }
    .await;

    let length = match merge_result {
        Ok(length) => length,
        Err(e) => {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }
    };
    fs::rename(&temp_path, merged_path).await?;

    debug!(
        upload_id = %session.id,
        chunks = expected,
        bytes = length,
        "chunks merged"
    );
    Ok(length)
}

/// Scan the staging directory for chunk artifact indices.
///
/// Temp files and anything else that doesn't parse as `{index}.chunk` are
/// ignored. A missing staging directory reads as no chunks staged.
async fn staged_indices(session: &UploadSession) -> Result<BTreeSet<u32>> {
    let mut indices = BTreeSet::new();
    let mut dir = match fs::read_dir(&session.staging_dir).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(indices),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(stem) = name.strip_suffix(".chunk") else {
            continue;
        };
        if let Ok(index) = stem.parse::<u32>() {
            indices.insert(index);
        }
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use hoist_core::UploadId;
    use std::sync::Arc;

    async fn staged_session(
        dir: &Path,
        id: &str,
        chunks: &[(u32, &[u8])],
    ) -> Arc<UploadSession> {
        let store = SessionStore::new(8);
        let id = UploadId::parse(id).unwrap();
        let (session, _) = store.open_or_get(&id, dir).unwrap();
        fs::create_dir_all(&session.staging_dir).await.unwrap();
        for (index, payload) in chunks {
            fs::write(session.chunk_path(*index), payload).await.unwrap();
        }
        session
    }

    #[tokio::test]
    async fn test_merge_concatenates_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let session = staged_session(
            dir.path(),
            "u1",
            &[(3, b"cc".as_slice()), (1, b"aa".as_slice()), (2, b"bb".as_slice())],
        )
        .await;
        let merged = dir.path().join("u1.merged");
        let cancel = CancellationToken::new();

        let length = merge_chunks(&session, Some(3), &merged, &cancel)
            .await
            .unwrap();
        assert_eq!(length, 6);
        assert_eq!(std::fs::read(&merged).unwrap(), b"aabbcc");
    }

    #[tokio::test]
    async fn test_merge_without_declared_total_uses_highest_index() {
        let dir = tempfile::tempdir().unwrap();
        let session = staged_session(dir.path(), "u1", &[(1, b"x".as_slice()), (2, b"y".as_slice())]).await;
        let merged = dir.path().join("u1.merged");
        let cancel = CancellationToken::new();

        let length = merge_chunks(&session, None, &merged, &cancel).await.unwrap();
        assert_eq!(length, 2);
        assert_eq!(std::fs::read(&merged).unwrap(), b"xy");
    }

    #[tokio::test]
    async fn test_merge_reports_every_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let session = staged_session(dir.path(), "u1", &[(2, b"b".as_slice()), (5, b"e".as_slice())]).await;
        let merged = dir.path().join("u1.merged");
        let cancel = CancellationToken::new();

        match merge_chunks(&session, Some(5), &merged, &cancel).await {
            Err(UploadError::IncompleteUpload { expected, missing }) => {
                assert_eq!(expected, 5);
                assert_eq!(missing, vec![1, 3, 4]);
            }
            other => panic!("expected IncompleteUpload, got {other:?}"),
        }
        // staging untouched, no merged artifact
        assert!(session.chunk_path(2).exists());
        assert!(!merged.exists());
    }

    #[tokio::test]
    async fn test_merge_widens_declared_total_to_highest_index() {
        let dir = tempfile::tempdir().unwrap();
        let session = staged_session(dir.path(), "u1", &[(1, b"a".as_slice()), (4, b"d".as_slice())]).await;
        let merged = dir.path().join("u1.merged");
        let cancel = CancellationToken::new();

        match merge_chunks(&session, Some(2), &merged, &cancel).await {
            Err(UploadError::IncompleteUpload { expected, missing }) => {
                assert_eq!(expected, 4);
                assert_eq!(missing, vec![2, 3]);
            }
            other => panic!("expected IncompleteUpload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_merge_with_no_chunks_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let session = staged_session(dir.path(), "u1", &[]).await;
        let merged = dir.path().join("u1.merged");
        let cancel = CancellationToken::new();

        assert!(matches!(
            merge_chunks(&session, None, &merged, &cancel).await,
            Err(UploadError::IncompleteUpload { expected: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_merge_ignores_stray_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let session = staged_session(dir.path(), "u1", &[(1, b"data".as_slice())]).await;
        fs::write(session.staging_dir.join(".tmp.leftover"), b"junk")
            .await
            .unwrap();
        let merged = dir.path().join("u1.merged");
        let cancel = CancellationToken::new();

        let length = merge_chunks(&session, Some(1), &merged, &cancel).await.unwrap();
        assert_eq!(length, 4);
        assert_eq!(std::fs::read(&merged).unwrap(), b"data");
    }
}
