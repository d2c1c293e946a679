//! CRC-32 checksum over the merged file.

use crate::error::{Result, UploadError};
use hoist_core::COPY_BUFFER_SIZE;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

/// Compute the CRC-32 (IEEE 802.3 polynomial) of a file's bytes.
///
/// Streams the file in fixed-size reads so the merged file never has to fit
/// in memory.
pub(crate) async fn crc32_file(path: &Path, cancel: &CancellationToken) -> Result<u32> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}
