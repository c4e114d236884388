//! Key-value persistence.
//!
//! The clinic's records live in a remote key-value API. [`KeyValueStore`] is
//! the seam to it: point reads, prefix listing, and atomic batched commits
//! guarded by per-key preconditions. [`MemoryStore`] is the in-process
//! backend; [`ClinicRepository`] layers typed accessors and the
//! [`RetryPolicy`] on top.

mod memory;
mod repository;
mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;
pub use repository::{ClinicRepository, Versioned, keys};
pub use retry::RetryPolicy;

/// A stored JSON document with its version.
///
/// Versions start at 1 and increase by one on every write to the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedValue {
    /// The stored document.
    pub value: serde_json::Value,
    /// The version of the document.
    pub version: u64,
}

/// A condition a key must satisfy for a commit to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional write.
    None,
    /// The key must not exist yet.
    Absent,
    /// The key must exist at exactly this version.
    Version(u64),
}

/// One write in an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace a document.
    Put {
        /// The key to write.
        key: String,
        /// The new document.
        value: serde_json::Value,
        /// Condition checked before the batch applies.
        precondition: Precondition,
    },
    /// Remove a document. Removing a missing key is not an error.
    Delete {
        /// The key to remove.
        key: String,
        /// Condition checked before the batch applies.
        precondition: Precondition,
    },
}

impl WriteOp {
    /// The key this write touches.
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key, .. } => key,
        }
    }

    /// The condition the key must satisfy.
    pub fn precondition(&self) -> Precondition {
        match self {
            WriteOp::Put { precondition, .. } | WriteOp::Delete { precondition, .. } => *precondition,
        }
    }
}

/// Errors reported by a [`KeyValueStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A precondition failed; nothing in the batch was written.
    #[error("precondition failed for key '{key}'")]
    Conflict {
        /// The first key whose precondition failed.
        key: String,
    },

    /// The store could not be reached. Safe to retry.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// A description of the transport failure.
        message: String,
    },
}

/// Asynchronous access to a versioned key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads one document.
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError>;

    /// Lists every document whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, VersionedValue)>, StoreError>;

    /// Applies every write in `ops` or none of them.
    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}
