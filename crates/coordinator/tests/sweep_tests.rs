//! Background sweeper behavior.

mod common;

use bytes::Bytes;
use common::memory::MemoryStore;
use hoist_core::{ChunkSubmission, CoordinatorConfig, UploadId};
use hoist_coordinator::{spawn_sweeper, UploadCoordinator};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_sweeper_evicts_idle_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoordinatorConfig {
        temp_path: dir.path().join("staging"),
        session_ttl_secs: 1,
        max_active_sessions: 4,
    };
    let coordinator = UploadCoordinator::new(config, Arc::new(MemoryStore::new()))
        .await
        .unwrap();

    coordinator
        .append_chunk(ChunkSubmission {
            upload_id: UploadId::parse("idle").unwrap(),
            index: 1,
            total_chunks: None,
            file_name: None,
            content_type: None,
            file_size: None,
            payload: Bytes::from_static(b"abandoned"),
        })
        .await
        .unwrap();
    assert_eq!(coordinator.active_sessions(), 1);

    let cancel = CancellationToken::new();
    let handle = spawn_sweeper(
        coordinator.clone(),
        Duration::from_millis(200),
        cancel.clone(),
    );

    // TTL is one second; give the sweeper a couple of ticks past it
    tokio::time::sleep(Duration::from_millis(1_600)).await;
    assert_eq!(coordinator.active_sessions(), 0);
    assert!(!dir.path().join("staging/idle").exists());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_sweeper_stops_on_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoordinatorConfig::for_testing(dir.path().join("staging"));
    let coordinator = UploadCoordinator::new(config, Arc::new(MemoryStore::new()))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let handle = spawn_sweeper(coordinator, Duration::from_secs(3600), cancel.clone());
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("sweeper did not stop after cancellation")
        .unwrap();
}
