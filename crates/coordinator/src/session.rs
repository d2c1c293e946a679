//! In-memory session registry and per-session state.

use crate::error::{Result, UploadError};
use hoist_core::{ChunkSubmission, SessionPhase, UploadId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Metadata hints accumulated from chunk submissions.
///
/// Senders may declare these on any chunk; for `total_chunks` and
/// `file_size` the largest declared value wins, so late-arriving hints
/// never shrink the expectation.
#[derive(Clone, Debug, Default)]
pub struct SessionHints {
    pub total_chunks: Option<u32>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<u64>,
}

/// One open upload session.
///
/// The `gate` serializes phase transitions against in-flight appends:
/// appends hold it shared, completion and eviction hold it exclusive.
pub struct UploadSession {
    pub id: UploadId,
    pub staging_dir: PathBuf,
    /// Where this session's reassembled file lands. Unique per session, so
    /// a later session reusing the id can never collide with a merged file
    /// kept by an earlier one.
    pub merged_path: PathBuf,
    pub created_at: OffsetDateTime,
    pub gate: RwLock<SessionPhase>,
    last_activity: Mutex<Instant>,
    hints: Mutex<SessionHints>,
}

impl UploadSession {
    fn new(id: UploadId, staging_root: &Path) -> Self {
        let staging_dir = staging_root.join(id.as_str());
        let merged_path = staging_root.join(format!("{id}.{}.merged", Uuid::new_v4().simple()));
        Self {
            id,
            staging_dir,
            merged_path,
            created_at: OffsetDateTime::now_utc(),
            gate: RwLock::new(SessionPhase::Accumulating),
            last_activity: Mutex::new(Instant::now()),
            hints: Mutex::new(SessionHints::default()),
        }
    }

    /// Path of the staged artifact for a chunk index.
    ///
    /// Zero-padded so lexical order matches numeric order.
    pub fn chunk_path(&self, index: u32) -> PathBuf {
        self.staging_dir.join(format!("{index:08}.chunk"))
    }

    /// Refresh the idle clock.
    pub fn touch(&self) {
        if let Ok(mut at) = self.last_activity.lock() {
            *at = Instant::now();
        }
    }

    /// Time since the last append (or since the session opened).
    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .map(|at| at.elapsed())
            .unwrap_or_default()
    }

    /// Fold a submission's hints into the session and return the effective
    /// declared chunk total, if any sender has declared one.
    pub fn record_hints(&self, submission: &ChunkSubmission) -> Option<u32> {
        let mut hints = match self.hints.lock() {
            Ok(h) => h,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(total) = submission.total_chunks {
            hints.total_chunks = Some(hints.total_chunks.map_or(total, |t| t.max(total)));
        }
        if let Some(size) = submission.file_size {
            hints.file_size = Some(hints.file_size.map_or(size, |s| s.max(size)));
        }
        if hints.file_name.is_none() {
            hints.file_name = submission.file_name.clone();
        }
        if hints.content_type.is_none() {
            hints.content_type = submission.content_type.clone();
        }
        hints.total_chunks
    }

    /// Snapshot the accumulated hints.
    pub fn hints(&self) -> SessionHints {
        match self.hints.lock() {
            Ok(h) => h.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Registry of open sessions with a hard cap on concurrency.
///
/// A plain mutex-guarded map: the capacity check and the insert must be one
/// atomic step, and the critical sections are short with no await inside.
pub struct SessionStore {
    sessions: Mutex<HashMap<UploadId, Arc<UploadSession>>>,
    max_active: usize,
}

impl SessionStore {
    pub fn new(max_active: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_active,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UploadId, Arc<UploadSession>>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Look up an existing session or open a new one.
    ///
    /// Returns the session and whether it was newly opened. Opening fails
    /// with [`UploadError::CapacityExceeded`] when the cap is reached.
    pub fn open_or_get(
        &self,
        id: &UploadId,
        staging_root: &Path,
    ) -> Result<(Arc<UploadSession>, bool)> {
        let mut sessions = self.lock();
        if let Some(session) = sessions.get(id) {
            return Ok((Arc::clone(session), false));
        }
        if sessions.len() >= self.max_active {
            return Err(UploadError::CapacityExceeded {
                max: self.max_active,
            });
        }
        let session = Arc::new(UploadSession::new(id.clone(), staging_root));
        sessions.insert(id.clone(), Arc::clone(&session));
        Ok((session, true))
    }

    /// Look up a session without opening one.
    pub fn get(&self, id: &UploadId) -> Option<Arc<UploadSession>> {
        self.lock().get(id).map(Arc::clone)
    }

    /// Remove a session, freeing its capacity slot.
    pub fn remove(&self, id: &UploadId) -> Option<Arc<UploadSession>> {
        self.lock().remove(id)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no sessions are open.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of all open sessions, for eviction scans.
    pub fn snapshot(&self) -> Vec<Arc<UploadSession>> {
        self.lock().values().map(Arc::clone).collect()
    }
}
