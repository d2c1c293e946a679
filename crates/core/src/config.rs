//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upload coordinator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Root directory for per-session staging areas and merged files.
    #[serde(default = "default_temp_path")]
    pub temp_path: PathBuf,
    /// Idle time after which a session is evicted, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Maximum number of simultaneously active upload sessions.
    #[serde(default = "default_max_active_sessions")]
    pub max_active_sessions: usize,
}

fn default_temp_path() -> PathBuf {
    PathBuf::from("./data/staging")
}

fn default_session_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_max_active_sessions() -> usize {
    128
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            temp_path: default_temp_path(),
            session_ttl_secs: default_session_ttl_secs(),
            max_active_sessions: default_max_active_sessions(),
        }
    }
}

impl CoordinatorConfig {
    /// Create a test configuration rooted at the given staging directory.
    ///
    /// **For testing only.** Uses a short TTL and a small session cap.
    pub fn for_testing(temp_path: impl Into<PathBuf>) -> Self {
        Self {
            temp_path: temp_path.into(),
            session_ttl_secs: 60,
            max_active_sessions: 8,
        }
    }

    /// Get the session TTL as a Duration.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_active_sessions == 0 {
            return Err("max_active_sessions must be at least 1".to_string());
        }
        if self.session_ttl_secs == 0 {
            return Err("session_ttl_secs must be at least 1".to_string());
        }
        if self.temp_path.as_os_str().is_empty() {
            return Err("temp_path must not be empty".to_string());
        }
        Ok(())
    }
}

/// Blob store backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for stored blobs.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/blobs"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::Filesystem { path } => {
                if path.as_os_str().is_empty() {
                    return Err("filesystem storage path must not be empty".to_string());
                }
                Ok(())
            }
        }
    }
}
