//! # keel-checkpoint - Versioned State Persistence
//!
//! Per-thread, versioned persistence of agent execution state. A crashed or
//! paused run resumes from its latest [`Checkpoint`] without re-executing
//! completed steps.
//!
//! ## Core Concepts
//!
//! - **[`Checkpoint`]** - snapshot of conversation, state and workflow
//!   position; immutable once saved
//! - **Thread** - a naming scope grouping checkpoints; versions are dense
//!   per thread, starting at 1
//! - **[`CheckpointStore`]** - the storage trait; save/load/list/delete plus
//!   [`rollback`](CheckpointStore::rollback), which restores an old version
//!   by appending a new one (history is never rewritten)
//!
//! ## Implementations
//!
//! - [`FileCheckpointStore`] - file-backed, one JSON file per checkpoint
//!   with a per-thread version index; atomic temp-file-then-rename writes
//! - [`InMemoryCheckpointStore`] - ephemeral reference implementation for
//!   development and tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use keel_checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore};
//! use keel_core::AgentState;
//!
//! # async fn example() -> keel_checkpoint::Result<()> {
//! let store = FileCheckpointStore::open("/var/lib/keel").await?;
//!
//! let saved = store
//!     .save(Checkpoint::new("thread-1", "agent-1", AgentState::Running, vec![]))
//!     .await?;
//! assert_eq!(saved.version, 1);
//!
//! let latest = store.load_latest("thread-1").await?;
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use checkpoint::{Checkpoint, ExecutionContext, VersionEntry, ROLLBACK_FROM_VERSION_KEY};
pub use error::{CheckpointError, Result};
pub use file::FileCheckpointStore;
pub use memory::InMemoryCheckpointStore;
pub use store::CheckpointStore;
