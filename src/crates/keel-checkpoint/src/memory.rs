//! In-memory checkpoint storage for development and testing
//!
//! A reference implementation of [`CheckpointStore`] backed by a
//! thread-safe map. All operations are in-memory: fast, dependency-free,
//! and ephemeral - data is lost on restart. Use the file-backed store for
//! anything that must survive a crash.

use crate::checkpoint::{Checkpoint, VersionEntry};
use crate::error::{CheckpointError, Result};
use crate::store::CheckpointStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Storage = Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>;

/// In-memory checkpoint store
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    storage: Storage,
}

impl InMemoryCheckpointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads being tracked.
    pub async fn thread_count(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Total number of checkpoints across all threads.
    pub async fn checkpoint_count(&self) -> usize {
        self.storage
            .read()
            .await
            .values()
            .map(|checkpoints| checkpoints.len())
            .sum()
    }

    /// Remove all checkpoints (useful between tests).
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, mut checkpoint: Checkpoint) -> Result<Checkpoint> {
        let mut storage = self.storage.write().await;
        let checkpoints = storage.entry(checkpoint.thread_id.clone()).or_default();

        if checkpoint.version == 0 {
            checkpoint.version = checkpoints
                .last()
                .map(|latest| latest.version + 1)
                .unwrap_or(1);
        }
        checkpoints.push(checkpoint.clone());
        Ok(checkpoint)
    }

    async fn load(&self, id: &str) -> Result<Checkpoint> {
        let storage = self.storage.read().await;
        storage
            .values()
            .flatten()
            .find(|checkpoint| checkpoint.id == id)
            .cloned()
            .ok_or_else(|| CheckpointError::NotFound(id.to_string()))
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Checkpoint> {
        let storage = self.storage.read().await;
        storage
            .get(thread_id)
            .and_then(|checkpoints| checkpoints.last())
            .cloned()
            .ok_or_else(|| {
                CheckpointError::NotFound(format!("no checkpoints for thread {thread_id}"))
            })
    }

    async fn load_version(&self, thread_id: &str, version: u64) -> Result<Checkpoint> {
        let storage = self.storage.read().await;
        storage
            .get(thread_id)
            .and_then(|checkpoints| checkpoints.iter().find(|c| c.version == version))
            .cloned()
            .ok_or_else(|| {
                CheckpointError::NotFound(format!("thread {thread_id} version {version}"))
            })
    }

    async fn list(&self, thread_id: &str, limit: usize) -> Result<Vec<Checkpoint>> {
        let storage = self.storage.read().await;
        let mut checkpoints = storage.get(thread_id).cloned().unwrap_or_default();
        checkpoints.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.version.cmp(&a.version))
        });
        checkpoints.truncate(limit);
        Ok(checkpoints)
    }

    async fn list_versions(&self, thread_id: &str) -> Result<Vec<VersionEntry>> {
        let storage = self.storage.read().await;
        Ok(storage
            .get(thread_id)
            .map(|checkpoints| {
                checkpoints
                    .iter()
                    .map(|c| VersionEntry {
                        version: c.version,
                        checkpoint_id: c.id.clone(),
                        created_at: c.created_at,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut storage = self.storage.write().await;
        for checkpoints in storage.values_mut() {
            if let Some(pos) = checkpoints.iter().position(|c| c.id == id) {
                checkpoints.remove(pos);
                return Ok(());
            }
        }
        Err(CheckpointError::NotFound(id.to_string()))
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.storage.write().await.remove(thread_id);
        Ok(())
    }
}
