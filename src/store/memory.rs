//! In-memory [`KeyValueStore`] backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{KeyValueStore, Precondition, StoreError, VersionedValue, WriteOp};

/// A [`KeyValueStore`] held in process memory.
///
/// Commits take the write lock for the whole batch, so preconditions and
/// writes apply atomically with respect to every other caller.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, VersionedValue>>,
    failures_pending: AtomicU32,
    lost_acks_pending: AtomicU32,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, count: u32) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` successful commits apply their writes and
    /// then report [`StoreError::Unavailable`], as if the acknowledgement
    /// was lost in transit.
    pub fn lose_next_acks(&self, count: u32) {
        self.lost_acks_pending.store(count, Ordering::SeqCst);
    }

    fn injected_failure(&self) -> Result<(), StoreError> {
        if take_one(&self.failures_pending) {
            return Err(StoreError::Unavailable {
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
        self.injected_failure()?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, VersionedValue)>, StoreError> {
        self.injected_failure()?;
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        self.injected_failure()?;
        let mut entries = self.entries.write().await;

        for op in &ops {
            let key = op.key();
            let precondition = op.precondition();
            let current = entries.get(key).map(|v| v.version);
            let satisfied = match precondition {
                Precondition::None => true,
                Precondition::Absent => current.is_none(),
                Precondition::Version(expected) => current == Some(expected),
            };
            if !satisfied {
                debug!(key = %key, ?precondition, ?current, "Commit precondition failed");
                return Err(StoreError::Conflict { key: key.to_string() });
            }
        }

        for op in ops {
            match op {
                WriteOp::Put { key, value, .. } => {
                    let version = entries.get(&key).map_or(1, |v| v.version + 1);
                    entries.insert(key, VersionedValue { value, version });
                }
                WriteOp::Delete { key, .. } => {
                    entries.remove(&key);
                }
            }
        }

        if take_one(&self.lost_acks_pending) {
            debug!("Dropping commit acknowledgement");
            return Err(StoreError::Unavailable {
                message: "acknowledgement lost".to_string(),
            });
        }
        Ok(())
    }
}
