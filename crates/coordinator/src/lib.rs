//! Chunked upload coordination for hoist.
//!
//! Large files arrive as out-of-order chunks tagged with a caller-chosen
//! upload id. The [`UploadCoordinator`] stages each chunk on local disk,
//! reassembles them in index order on completion, verifies a CRC-32 over the
//! merged bytes, and hands the file to a pluggable
//! [`BlobStore`](hoist_storage::BlobStore) for durable commit. Idle sessions
//! are evicted after a TTL, lazily on append and periodically by the
//! [`spawn_sweeper`] task.

mod checksum;
mod chunk;
mod merge;

pub mod coordinator;
pub mod error;
pub mod session;
pub mod sweep;

pub use coordinator::UploadCoordinator;
pub use error::{Result, UploadError};
pub use session::{SessionHints, SessionStore, UploadSession};
pub use sweep::spawn_sweeper;
