//! In-memory storage backend implementation.
//!
//! This module provides the volatile reference store. Every issued nonce gets
//! its own expiry task; the task and an explicit consumption race for the same
//! map entry under the same lock, so whichever runs first wins and the other
//! finds the key already gone.

use super::{NonceEntry, NonceStorage, StorageStats};
use crate::NonceError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;

/// A stored entry plus the handle of the task that will expire it.
#[derive(Debug)]
struct Slot {
    entry: NonceEntry,
    /// Distinguishes this issuance from a later one of the same value.
    generation: u64,
    expiry: AbortHandle,
}

type SlotMap = HashMap<String, Slot>;

/// A volatile, in-memory nonce store for single-instance bastions.
///
/// Entries live in a `HashMap` behind tokio's `RwLock`. Each `set` spawns a
/// task that sleeps for the TTL and then deletes the entry; `take` and
/// `remove` abort that task. Nothing survives a restart, and the number of
/// live nonces is not bounded.
///
/// Must be used from within a tokio runtime, since `set` spawns the expiry
/// task.
///
/// # Example
///
/// ```rust
/// use peasant::storage::{MemoryStorage, NonceStorage};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), peasant::NonceError> {
/// let storage = MemoryStorage::new();
///
/// storage.set("my-nonce", Duration::from_millis(250)).await?;
/// assert!(storage.exists("my-nonce").await?);
///
/// // First consumption wins, the second finds nothing
/// assert!(storage.take("my-nonce").await?);
/// assert!(!storage.take("my-nonce").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Arc<RwLock<SlotMap>>,
    generation: AtomicU64,
}

impl MemoryStorage {
    /// Creates a new in-memory storage instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage instance with room for `capacity` live nonces.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::with_capacity(capacity))),
            generation: AtomicU64::new(0),
        }
    }

    /// Spawns the task that expires one issuance of `nonce`.
    fn schedule_expiry(
        data: Arc<RwLock<SlotMap>>,
        nonce: String,
        generation: u64,
        ttl: Duration,
    ) -> AbortHandle {
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut data = data.write().await;
            match data.get(&nonce) {
                Some(slot) if slot.generation == generation => {
                    data.remove(&nonce);
                    tracing::debug!(nonce = %nonce, "nonce expired");
                }
                _ => tracing::trace!(nonce = %nonce, "expiry found nonce already gone"),
            }
        })
        .abort_handle()
    }
}

#[async_trait]
impl NonceStorage for MemoryStorage {
    async fn set(&self, nonce: &str, ttl: Duration) -> Result<(), NonceError> {
        let mut data = self.data.write().await;
        if data.get(nonce).is_some_and(|slot| !slot.entry.is_expired()) {
            return Err(NonceError::DuplicateNonce);
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        // The task cannot delete before the insert below: it needs the write
        // lock we are holding.
        let expiry = Self::schedule_expiry(
            Arc::clone(&self.data),
            nonce.to_string(),
            generation,
            ttl,
        );
        let slot = Slot {
            entry: NonceEntry::new(nonce, ttl),
            generation,
            expiry,
        };
        if let Some(stale) = data.insert(nonce.to_string(), slot) {
            stale.expiry.abort();
        }
        Ok(())
    }

    async fn get(&self, nonce: &str) -> Result<Option<NonceEntry>, NonceError> {
        let data = self.data.read().await;
        Ok(data
            .get(nonce)
            .filter(|slot| !slot.entry.is_expired())
            .map(|slot| slot.entry.clone()))
    }

    async fn take(&self, nonce: &str) -> Result<bool, NonceError> {
        let mut data = self.data.write().await;
        match data.remove(nonce) {
            Some(slot) => {
                slot.expiry.abort();
                Ok(!slot.entry.is_expired())
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, nonce: &str) -> Result<bool, NonceError> {
        let mut data = self.data.write().await;
        match data.remove(nonce) {
            Some(slot) => {
                slot.expiry.abort();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cleanup_expired(&self) -> Result<usize, NonceError> {
        let mut data = self.data.write().await;
        let initial_count = data.len();
        data.retain(|_, slot| {
            let live = !slot.entry.is_expired();
            if !live {
                slot.expiry.abort();
            }
            live
        });
        Ok(initial_count - data.len())
    }

    async fn get_stats(&self) -> Result<StorageStats, NonceError> {
        let data = self.data.read().await;
        let memory_usage = data.len() * std::mem::size_of::<Slot>();
        Ok(StorageStats {
            total_records: data.len(),
            backend_info: format!("In-memory HashMap storage (~{} bytes)", memory_usage),
        })
    }
}

impl Drop for MemoryStorage {
    fn drop(&mut self) {
        // Expiry tasks hold their own handle on the map; stop them with the store.
        if let Ok(data) = self.data.try_read() {
            for slot in data.values() {
                slot.expiry.abort();
            }
        }
    }
}
