//! Extensible checkpoint storage trait for custom backend implementations
//!
//! [`CheckpointStore`] is the abstraction the runtime persists through. Two
//! implementations ship with this crate - [`FileCheckpointStore`]
//! (production, file-backed) and [`InMemoryCheckpointStore`] (development and
//! tests) - and downstream projects can back the same trait with any storage
//! system.
//!
//! # Contract
//!
//! - `save` assigns the next dense per-thread version when the caller left
//!   `version == 0`, and returns the checkpoint with its assigned version.
//!   The caller-supplied `id` and `created_at` are preserved.
//! - `load*` operations fail with [`CheckpointError::NotFound`] for missing
//!   ids, versions or empty threads; not-found is expected, not exceptional.
//! - `list` orders newest-first by `created_at`, ties broken by higher
//!   version; `list_versions` is the dense index, version ascending.
//! - `rollback` never rewrites history: it re-saves a copy of the target
//!   version as a *new* highest version, annotated with
//!   [`ROLLBACK_FROM_VERSION_KEY`].
//!
//! Implementations must be `Send + Sync`; concurrent saves to the same
//! thread must be serialized, saves to different threads must be
//! independent.
//!
//! [`FileCheckpointStore`]: crate::file::FileCheckpointStore
//! [`InMemoryCheckpointStore`]: crate::memory::InMemoryCheckpointStore
//! [`CheckpointError::NotFound`]: crate::error::CheckpointError::NotFound
//! [`ROLLBACK_FROM_VERSION_KEY`]: crate::checkpoint::ROLLBACK_FROM_VERSION_KEY

use crate::checkpoint::{Checkpoint, VersionEntry, ROLLBACK_FROM_VERSION_KEY};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

/// Storage backend for versioned, per-thread checkpoints
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a checkpoint, assigning the next version if unassigned.
    ///
    /// Returns the stored checkpoint including its assigned version.
    async fn save(&self, checkpoint: Checkpoint) -> Result<Checkpoint>;

    /// Load a checkpoint by id, searching across threads.
    async fn load(&self, id: &str) -> Result<Checkpoint>;

    /// Load the highest-version checkpoint of a thread.
    async fn load_latest(&self, thread_id: &str) -> Result<Checkpoint>;

    /// Load the checkpoint recorded at the given version of a thread.
    async fn load_version(&self, thread_id: &str, version: u64) -> Result<Checkpoint>;

    /// Up to `limit` checkpoints of a thread, newest first.
    async fn list(&self, thread_id: &str, limit: usize) -> Result<Vec<Checkpoint>>;

    /// The thread's ordered version index, version ascending.
    async fn list_versions(&self, thread_id: &str) -> Result<Vec<VersionEntry>>;

    /// Delete a checkpoint by id and drop it from the version index.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete a thread and all its checkpoints.
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Restore a thread to the state recorded at `version`.
    ///
    /// Loads the checkpoint at `version`, copies its state, messages,
    /// execution context and metadata into a fresh checkpoint annotated with
    /// `rollback_from_version`, and saves it as the new latest. Prior
    /// versions remain loadable unchanged.
    async fn rollback(&self, thread_id: &str, version: u64) -> Result<Checkpoint> {
        let source = self.load_version(thread_id, version).await?;

        let mut metadata = source.metadata.clone();
        metadata.insert(ROLLBACK_FROM_VERSION_KEY.to_string(), json!(version));

        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            thread_id: source.thread_id.clone(),
            agent_id: source.agent_id.clone(),
            state: source.state,
            messages: source.messages.clone(),
            metadata,
            created_at: Utc::now(),
            version: 0,
            execution_context: source.execution_context.clone(),
        };

        self.save(checkpoint).await
    }
}
