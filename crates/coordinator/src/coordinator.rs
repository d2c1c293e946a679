//! Upload coordination: append, complete, abort, evict.

use crate::error::{Result, UploadError};
use crate::session::SessionStore;
use crate::{checksum, chunk, merge};
use hoist_core::{
    ChunkSubmission, CompletionRequest, CompletionResult, CoordinatorConfig, SessionPhase,
    UploadId, UploadOptions,
};
use hoist_storage::BlobStore;
use std::sync::Arc;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Orchestrates chunked upload sessions from first chunk to committed blob.
///
/// Appends to distinct sessions run concurrently; within one session,
/// appends run concurrently with each other but never with completion,
/// abort, or eviction (the per-session gate serializes those).
pub struct UploadCoordinator {
    config: CoordinatorConfig,
    store: Arc<dyn BlobStore>,
    sessions: SessionStore,
    cancel: CancellationToken,
}

impl UploadCoordinator {
    /// Create a coordinator, validating the configuration and creating the
    /// staging root.
    pub async fn new(
        config: CoordinatorConfig,
        store: Arc<dyn BlobStore>,
    ) -> Result<Arc<Self>> {
        config
            .validate()
            .map_err(hoist_core::Error::Config)
            .map_err(UploadError::Invalid)?;
        fs::create_dir_all(&config.temp_path).await?;

        info!(
            temp_path = %config.temp_path.display(),
            session_ttl_secs = config.session_ttl_secs,
            max_active_sessions = config.max_active_sessions,
            backend = store.backend_name(),
            "upload coordinator ready"
        );
        let sessions = SessionStore::new(config.max_active_sessions);
        Ok(Arc::new(Self {
            config,
            store,
            sessions,
            cancel: CancellationToken::new(),
        }))
    }

    /// Stage one chunk, opening the session on first sight of its id.
    ///
    /// Chunks may arrive in any order; resubmitting an index replaces the
    /// earlier artifact. An index of zero, or beyond the declared total, is
    /// rejected without touching the session's staged data.
    #[instrument(skip(self, submission), fields(upload_id = %submission.upload_id, index = submission.index))]
    pub async fn append_chunk(&self, submission: ChunkSubmission) -> Result<()> {
        // Opportunistic eviction so stale sessions can't pin capacity slots
        // between sweeper ticks.
        let evicted = self.evict_expired().await;
        if evicted > 0 {
            debug!(evicted, "evicted expired sessions before append");
        }

        if submission.index == 0 {
            return Err(UploadError::InvalidChunkIndex {
                index: 0,
                total: submission.total_chunks.unwrap_or(0),
            });
        }

        let (session, created) =
            self.sessions
                .open_or_get(&submission.upload_id, &self.config.temp_path)?;
        if created {
            info!(active = self.sessions.len(), "upload session opened");
        }

        let phase = session.gate.read().await;
        if !phase.is_active() {
            return Err(UploadError::SessionNotFound(
                submission.upload_id.to_string(),
            ));
        }

        if let Some(total) = session.record_hints(&submission) {
            if submission.index > total {
                return Err(UploadError::InvalidChunkIndex {
                    index: submission.index,
                    total,
                });
            }
        }

        chunk::write_chunk(&session, &submission, &self.cancel).await?;
        session.touch();
        Ok(())
    }

    /// Merge, checksum, and commit a session's chunks.
    ///
    /// On [`UploadError::IncompleteUpload`] the session survives so the
    /// caller can resend the missing chunks; a staging I/O failure likewise
    /// leaves the session in place for retry. Success and commit failure are
    /// both terminal: the session is removed and its staging directory
    /// deleted.
    #[instrument(skip(self, request), fields(upload_id = %request.upload_id))]
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult> {
        let session = self
            .sessions
            .get(&request.upload_id)
            .ok_or_else(|| UploadError::SessionNotFound(request.upload_id.to_string()))?;

        // Exclusive gate: waits out in-flight appends, and blocks new ones
        // for the duration of the pipeline.
        let mut phase = session.gate.write().await;
        if !phase.is_active() {
            return Err(UploadError::SessionNotFound(request.upload_id.to_string()));
        }

        let hints = session.hints();
        let merged_path = session.merged_path.clone();
        let length =
            merge::merge_chunks(&session, hints.total_chunks, &merged_path, &self.cancel).await?;

        let crc = match checksum::crc32_file(&merged_path, &self.cancel).await {
            Ok(crc) => crc,
            Err(e) => {
                remove_file_quiet(&merged_path).await;
                return Err(e);
            }
        };

        let blob = if request.commit_to_storage {
            let file_name = request
                .file_name
                .clone()
                .or_else(|| hints.file_name.clone())
                .unwrap_or_else(|| request.upload_id.to_string());
            let mut options = UploadOptions::new(file_name);
            options.directory = request.directory.clone();
            options.content_type = request
                .content_type
                .clone()
                .or_else(|| hints.content_type.clone());
            if let Some(metadata) = &request.metadata {
                options.metadata = metadata.clone();
            }

            let commit_result = match fs::File::open(&merged_path).await {
                Ok(mut file) => self
                    .store
                    .upload(&mut file, &options)
                    .await
                    .map_err(UploadError::from_commit),
                Err(e) => Err(e.into()),
            };
            match commit_result {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    // A failed commit discards the session; resending chunks
                    // won't fix the backend, so the caller starts over.
                    warn!(error = %e, "storage commit failed, discarding session");
                    *phase = SessionPhase::Aborted;
                    remove_file_quiet(&merged_path).await;
                    remove_dir_quiet(&session.staging_dir).await;
                    // unregister last: until here a retried append waits on
                    // the gate instead of staging into a doomed directory
                    self.sessions.remove(&request.upload_id);
                    return Err(e);
                }
            }
        } else {
            None
        };

        *phase = SessionPhase::Completed;
        remove_dir_quiet(&session.staging_dir).await;
        let merged_file = if request.keep_merged_file {
            Some(merged_path)
        } else {
            remove_file_quiet(&merged_path).await;
            None
        };
        // unregister only once the staging directory is gone, so a new
        // session reusing this id can never have its staging area deleted
        // out from under it
        self.sessions.remove(&request.upload_id);

        info!(
            bytes = length,
            crc32 = format_args!("{crc:08x}"),
            committed = blob.is_some(),
            active = self.sessions.len(),
            "upload completed"
        );
        Ok(CompletionResult {
            checksum: crc,
            blob,
            merged_file,
        })
    }

    /// Discard a session and its staged chunks.
    ///
    /// Idempotent: aborting an unknown or already-removed session is a no-op.
    #[instrument(skip(self), fields(upload_id = %id))]
    pub async fn abort(&self, id: &UploadId) -> Result<()> {
        let Some(session) = self.sessions.get(id) else {
            return Ok(());
        };
        let mut phase = session.gate.write().await;
        if !phase.is_active() {
            // another finalization won the race
            return Ok(());
        }
        *phase = SessionPhase::Aborted;
        // delete while still registered and gated: an append racing this
        // abort either waits on the gate and fails SessionNotFound, or opens
        // a fresh session only after the old directory is gone
        remove_dir_quiet(&session.staging_dir).await;
        remove_file_quiet(&session.merged_path).await;
        self.sessions.remove(id);
        drop(phase);

        info!(active = self.sessions.len(), "upload session aborted");
        Ok(())
    }

    /// Evict every session idle past the TTL. Returns the eviction count.
    pub async fn evict_expired(&self) -> usize {
        let ttl = self.config.session_ttl();
        let mut evicted = 0;
        for session in self.sessions.snapshot() {
            if session.idle_for() < ttl {
                continue;
            }
            let mut phase = session.gate.write().await;
            // an append may have slipped in while we waited for the gate
            if !phase.is_active() || session.idle_for() < ttl {
                continue;
            }
            *phase = SessionPhase::Expired;
            remove_dir_quiet(&session.staging_dir).await;
            self.sessions.remove(&session.id);
            drop(phase);

            info!(upload_id = %session.id, "upload session expired");
            evicted += 1;
        }
        evicted
    }

    /// Number of currently open sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Token cancelled when [`UploadCoordinator::shutdown`] is called.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel in-flight staging, merge, and checksum work.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn remove_file_quiet(path: &std::path::Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove file");
        }
    }
}

async fn remove_dir_quiet(path: &std::path::Path) {
    if let Err(e) = fs::remove_dir_all(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove directory");
        }
    }
}
