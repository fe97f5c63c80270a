//! # surveyor-store
//!
//! Durable persistence for star-system state, with checkpointing and
//! compaction.
//!
//! - **Trait**: [`SystemStore`], an async object-safe store keyed by
//!   [`SystemAddress`]; [`open_store`] selects a backend from config.
//! - **Backends**: [`KvStore`], a log-structured engine with an append-only
//!   record log and manifest checkpoints, and [`SqliteStore`], an embedded
//!   SQLite document store in WAL mode.
//! - **Maintenance**: [`CheckpointScheduler`] drives periodic incremental
//!   checkpoints and less-frequent compaction.
//! - **Errors**: [`StoreError`] via `thiserror`.
//!
//! Both backends route every operation through a [`surveyor_tasks::SerialExecutor`],
//! so merges are atomic per key and checkpoints never observe a torn write.

#![deny(unsafe_code)]

use std::sync::Arc;

use async_trait::async_trait;

use surveyor_core::{StarSystem, SystemAddress};

pub mod codec;
pub mod config;
pub mod errors;
pub mod kv;
pub mod scheduler;
pub mod sqlite;

pub use config::{StoreBackend, StoreConfig};
pub use errors::{Result, StoreError};
pub use kv::KvStore;
pub use scheduler::CheckpointScheduler;
pub use sqlite::SqliteStore;

/// Async store of [`StarSystem`] records keyed by address.
///
/// Operations against the same key never interleave: each backend owns its
/// engine state on a single worker and runs submitted operations in order.
#[async_trait]
pub trait SystemStore: Send + Sync {
    /// Fetch the stored system, or a fresh default seeded with `name_hint`
    /// when the store has no record. Never errors on a missing key.
    ///
    /// When the stored record's name is unknown and the hint is known, the
    /// hint is backfilled into the record and written back.
    async fn get(&self, address: SystemAddress, name_hint: Option<&str>) -> Result<StarSystem>;

    /// Atomically merge `candidate` into the stored value for its address
    /// and return the merged result. The stored value is the left side of
    /// the merge, so earlier observations win.
    async fn merge_upsert(&self, candidate: StarSystem) -> Result<StarSystem>;

    /// Overwrite the stored value for `system.address` unconditionally.
    ///
    /// The escape hatch for edits a merge cannot express, such as removing
    /// a body. Live ingestion always goes through [`Self::merge_upsert`].
    async fn put(&self, system: StarSystem) -> Result<StarSystem>;

    /// Cheap checkpoint capturing recent writes.
    async fn take_incremental_checkpoint(&self) -> Result<()>;

    /// Expensive checkpoint that also reclaims space from obsolete record
    /// versions.
    async fn take_full_checkpoint_with_compaction(&self) -> Result<()>;

    /// Final incremental checkpoint, then drain and join the worker.
    async fn shutdown(&self) -> Result<()>;
}

/// Open the backend named by `config` and return it as a trait object.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn SystemStore>> {
    match config.backend {
        StoreBackend::Kv => Ok(Arc::new(KvStore::open(config).await?)),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(config).await?)),
    }
}

/// A name hint worth storing: non-empty and not the unknown placeholder.
pub(crate) fn known_hint(hint: Option<&str>) -> Option<&str> {
    hint.filter(|h| !h.is_empty() && *h != surveyor_core::UNKNOWN_NAME)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
