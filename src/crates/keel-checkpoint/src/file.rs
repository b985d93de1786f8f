//! File-backed checkpoint store
//!
//! Persists checkpoints under a base directory, one JSON file per
//! checkpoint, with a per-thread version index and a `latest` pointer:
//!
//! ```text
//! <base>/
//!   threads/
//!     <thread_id>/
//!       checkpoints/
//!         <checkpoint_id>.json   - one file per checkpoint, full payload
//!       versions.json            - ordered version index for this thread
//!       latest.txt               - checkpoint_id of the highest version
//! ```
//!
//! # Atomicity
//!
//! Every file write goes through write-to-temp-then-rename, so a crash
//! between the temp write and the rename leaves the previous valid file in
//! place and readers never observe half-written JSON. The version index is
//! mirrored in memory and rebuilt from `versions.json` files on
//! [`FileCheckpointStore::open`].
//!
//! # Concurrency
//!
//! A store-wide lock protects the in-memory index; a per-thread mutex
//! serializes index+file updates for one thread while saves to different
//! threads proceed independently. Reads consult the in-memory index alone.

use crate::checkpoint::{Checkpoint, VersionEntry};
use crate::error::{CheckpointError, Result};
use crate::store::CheckpointStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

type ThreadIndex = HashMap<String, Vec<VersionEntry>>;

/// Checkpoint store persisting to JSON files under a base directory
pub struct FileCheckpointStore {
    base_dir: PathBuf,
    index: Arc<RwLock<ThreadIndex>>,
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileCheckpointStore {
    /// Open a store rooted at `base_dir`, creating the directory layout if
    /// absent and rebuilding the in-memory index from the per-thread
    /// `versions.json` files.
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let threads_dir = base_dir.join("threads");
        fs::create_dir_all(&threads_dir).await?;

        let mut index = ThreadIndex::new();
        let mut entries = fs::read_dir(&threads_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let thread_id = entry.file_name().to_string_lossy().into_owned();
            let versions_path = entry.path().join("versions.json");
            match fs::read(&versions_path).await {
                Ok(bytes) => {
                    let versions: Vec<VersionEntry> =
                        serde_json::from_slice(&bytes).map_err(|e| {
                            CheckpointError::CorruptIndex(format!(
                                "{}: {}",
                                versions_path.display(),
                                e
                            ))
                        })?;
                    index.insert(thread_id, versions);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::debug!(
            base_dir = %base_dir.display(),
            threads = index.len(),
            "opened file checkpoint store"
        );

        Ok(Self {
            base_dir,
            index: Arc::new(RwLock::new(index)),
            thread_locks: Mutex::new(HashMap::new()),
        })
    }

    fn thread_dir(&self, thread_id: &str) -> PathBuf {
        self.base_dir.join("threads").join(thread_id)
    }

    fn checkpoint_path(&self, thread_id: &str, checkpoint_id: &str) -> PathBuf {
        self.thread_dir(thread_id)
            .join("checkpoints")
            .join(format!("{checkpoint_id}.json"))
    }

    fn versions_path(&self, thread_id: &str) -> PathBuf {
        self.thread_dir(thread_id).join("versions.json")
    }

    fn latest_path(&self, thread_id: &str) -> PathBuf {
        self.thread_dir(thread_id).join("latest.txt")
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_checkpoint_file(&self, thread_id: &str, checkpoint_id: &str) -> Result<Checkpoint> {
        let path = self.checkpoint_path(thread_id, checkpoint_id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CheckpointError::NotFound(checkpoint_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn persist_versions(&self, thread_id: &str, versions: &[VersionEntry]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(versions)?;
        Self::write_atomic(&self.versions_path(thread_id), &bytes).await
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, mut checkpoint: Checkpoint) -> Result<Checkpoint> {
        let thread_id = checkpoint.thread_id.clone();
        let lock = self.thread_lock(&thread_id).await;
        let _guard = lock.lock().await;

        if checkpoint.version == 0 {
            let index = self.index.read().await;
            checkpoint.version = index
                .get(&thread_id)
                .and_then(|entries| entries.last())
                .map(|entry| entry.version + 1)
                .unwrap_or(1);
        }

        fs::create_dir_all(self.thread_dir(&thread_id).join("checkpoints")).await?;

        let bytes = serde_json::to_vec_pretty(&checkpoint)?;
        Self::write_atomic(&self.checkpoint_path(&thread_id, &checkpoint.id), &bytes).await?;

        let versions = {
            let mut index = self.index.write().await;
            let entries = index.entry(thread_id.clone()).or_default();
            entries.push(VersionEntry {
                version: checkpoint.version,
                checkpoint_id: checkpoint.id.clone(),
                created_at: checkpoint.created_at,
            });
            entries.clone()
        };
        self.persist_versions(&thread_id, &versions).await?;
        Self::write_atomic(&self.latest_path(&thread_id), checkpoint.id.as_bytes()).await?;

        tracing::debug!(
            thread_id = %thread_id,
            checkpoint_id = %checkpoint.id,
            version = checkpoint.version,
            "saved checkpoint"
        );
        Ok(checkpoint)
    }

    async fn load(&self, id: &str) -> Result<Checkpoint> {
        let thread_id = {
            let index = self.index.read().await;
            index
                .iter()
                .find(|(_, entries)| entries.iter().any(|e| e.checkpoint_id == id))
                .map(|(thread_id, _)| thread_id.clone())
        };
        let thread_id = thread_id.ok_or_else(|| CheckpointError::NotFound(id.to_string()))?;
        self.read_checkpoint_file(&thread_id, id).await
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Checkpoint> {
        let latest = match fs::read_to_string(self.latest_path(thread_id)).await {
            Ok(content) => content.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CheckpointError::NotFound(format!(
                    "no checkpoints for thread {thread_id}"
                )))
            }
            Err(e) => return Err(e.into()),
        };
        self.read_checkpoint_file(thread_id, &latest).await
    }

    async fn load_version(&self, thread_id: &str, version: u64) -> Result<Checkpoint> {
        let checkpoint_id = {
            let index = self.index.read().await;
            index
                .get(thread_id)
                .and_then(|entries| entries.iter().find(|e| e.version == version))
                .map(|entry| entry.checkpoint_id.clone())
        };
        let checkpoint_id = checkpoint_id.ok_or_else(|| {
            CheckpointError::NotFound(format!("thread {thread_id} version {version}"))
        })?;
        self.read_checkpoint_file(thread_id, &checkpoint_id).await
    }

    async fn list(&self, thread_id: &str, limit: usize) -> Result<Vec<Checkpoint>> {
        let entries = {
            let index = self.index.read().await;
            index.get(thread_id).cloned().unwrap_or_default()
        };

        let mut checkpoints = Vec::with_capacity(entries.len());
        for entry in entries {
            checkpoints
                .push(self.read_checkpoint_file(thread_id, &entry.checkpoint_id).await?);
        }
        // Newest first; ties broken by higher version.
        checkpoints.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.version.cmp(&a.version))
        });
        checkpoints.truncate(limit);
        Ok(checkpoints)
    }

    async fn list_versions(&self, thread_id: &str) -> Result<Vec<VersionEntry>> {
        let index = self.index.read().await;
        Ok(index.get(thread_id).cloned().unwrap_or_default())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let thread_id = {
            let index = self.index.read().await;
            index
                .iter()
                .find(|(_, entries)| entries.iter().any(|e| e.checkpoint_id == id))
                .map(|(thread_id, _)| thread_id.clone())
        };
        let thread_id = thread_id.ok_or_else(|| CheckpointError::NotFound(id.to_string()))?;

        let lock = self.thread_lock(&thread_id).await;
        let _guard = lock.lock().await;

        match fs::remove_file(self.checkpoint_path(&thread_id, id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let (versions, latest) = {
            let mut index = self.index.write().await;
            let entries = index.entry(thread_id.clone()).or_default();
            entries.retain(|e| e.checkpoint_id != id);
            let latest = entries.last().map(|e| e.checkpoint_id.clone());
            (entries.clone(), latest)
        };
        self.persist_versions(&thread_id, &versions).await?;

        match latest {
            Some(latest_id) => {
                Self::write_atomic(&self.latest_path(&thread_id), latest_id.as_bytes()).await?
            }
            None => match fs::remove_file(self.latest_path(&thread_id)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let lock = self.thread_lock(thread_id).await;
        let _guard = lock.lock().await;

        match fs::remove_dir_all(self.thread_dir(thread_id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.index.write().await.remove(thread_id);
        Ok(())
    }
}
