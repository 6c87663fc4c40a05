//! Pluggable storage backends for live nonces.
//!
//! The bastion only needs to know which nonce values are currently live. This
//! module defines that contract as a trait so the volatile reference store can
//! be swapped for a durable or distributed one without touching the service or
//! the request pipeline.

use crate::NonceError;
use async_trait::async_trait;
use std::time::{Duration, Instant};

mod memory;
pub use memory::MemoryStorage;

/// A live nonce with its validity window.
#[derive(Debug, Clone)]
pub struct NonceEntry {
    /// The nonce value, which is also its key
    pub nonce: String,
    /// When the nonce was issued
    pub issued_at: Instant,
    /// How long after `issued_at` the nonce stays consumable
    pub ttl: Duration,
}

impl NonceEntry {
    /// Creates an entry issued now.
    pub fn new(nonce: impl Into<String>, ttl: Duration) -> Self {
        Self {
            nonce: nonce.into(),
            issued_at: Instant::now(),
            ttl,
        }
    }

    /// The instant after which the nonce is no longer consumable.
    ///
    /// `None` when the deadline is beyond what `Instant` can represent; such
    /// an entry never expires on its own.
    pub fn expires_at(&self) -> Option<Instant> {
        self.issued_at.checked_add(self.ttl)
    }

    /// Whether the TTL has elapsed.
    pub fn is_expired(&self) -> bool {
        self.expires_at()
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Statistics about a nonce storage backend.
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Number of entries currently held, including expired ones not yet swept
    pub total_records: usize,
    /// Additional backend-specific information
    pub backend_info: String,
}

/// Abstract storage backend for live nonces.
///
/// Presence of a value means the nonce is live; there is no other payload.
/// Every backend must make `set`, `take` and `remove` linearizable with
/// respect to each other: for one value, at most one `take` ever returns
/// `true`, no matter how many callers race or whether an expiry fires at the
/// same time.
///
/// An entry whose TTL has elapsed must behave exactly like a value that was
/// never issued, even if the backend has not physically removed it yet.
///
/// # Example Implementation
///
/// ```rust
/// use peasant::storage::{NonceEntry, NonceStorage, StorageStats};
/// use peasant::NonceError;
/// use async_trait::async_trait;
/// use std::collections::HashMap;
/// use std::time::Duration;
/// use tokio::sync::Mutex;
///
/// #[derive(Default)]
/// pub struct SweptStorage {
///     data: Mutex<HashMap<String, NonceEntry>>,
/// }
///
/// #[async_trait]
/// impl NonceStorage for SweptStorage {
///     async fn set(&self, nonce: &str, ttl: Duration) -> Result<(), NonceError> {
///         let mut data = self.data.lock().await;
///         if data.get(nonce).is_some_and(|entry| !entry.is_expired()) {
///             return Err(NonceError::DuplicateNonce);
///         }
///         data.insert(nonce.to_string(), NonceEntry::new(nonce, ttl));
///         Ok(())
///     }
///
///     async fn get(&self, nonce: &str) -> Result<Option<NonceEntry>, NonceError> {
///         let data = self.data.lock().await;
///         Ok(data.get(nonce).filter(|entry| !entry.is_expired()).cloned())
///     }
///
///     async fn take(&self, nonce: &str) -> Result<bool, NonceError> {
///         let mut data = self.data.lock().await;
///         Ok(data.remove(nonce).is_some_and(|entry| !entry.is_expired()))
///     }
///
///     async fn remove(&self, nonce: &str) -> Result<bool, NonceError> {
///         Ok(self.data.lock().await.remove(nonce).is_some())
///     }
///
///     async fn cleanup_expired(&self) -> Result<usize, NonceError> {
///         let mut data = self.data.lock().await;
///         let before = data.len();
///         data.retain(|_, entry| !entry.is_expired());
///         Ok(before - data.len())
///     }
///
///     async fn get_stats(&self) -> Result<StorageStats, NonceError> {
///         Ok(StorageStats {
///             total_records: self.data.lock().await.len(),
///             backend_info: "Swept HashMap storage".to_string(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait NonceStorage: Send + Sync {
    /// Optional method for storage backend initialization.
    ///
    /// Called once by the bastion builder before the first request.
    async fn init(&self) -> Result<(), NonceError> {
        Ok(())
    }

    /// Records a freshly issued nonce as live for `ttl`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the nonce was stored
    /// * `Err(NonceError::DuplicateNonce)` - If the value is already live
    /// * `Err(NonceError)` - If there was an error accessing storage
    async fn set(&self, nonce: &str, ttl: Duration) -> Result<(), NonceError>;

    /// Retrieves a live nonce entry.
    ///
    /// Returns `Ok(None)` for unknown, consumed and expired values alike.
    async fn get(&self, nonce: &str) -> Result<Option<NonceEntry>, NonceError>;

    /// Checks whether a nonce is live without consuming it.
    async fn exists(&self, nonce: &str) -> Result<bool, NonceError> {
        Ok(self.get(nonce).await?.is_some())
    }

    /// Atomically checks and invalidates a nonce.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The nonce was live and is now consumed
    /// * `Ok(false)` - The nonce was unknown, already consumed or expired
    /// * `Err(NonceError)` - If there was an error accessing storage
    async fn take(&self, nonce: &str) -> Result<bool, NonceError>;

    /// Removes a nonce if present.
    ///
    /// Idempotent: removing an absent value is not an error. Returns whether
    /// an entry was removed.
    async fn remove(&self, nonce: &str) -> Result<bool, NonceError>;

    /// Removes every entry whose TTL has elapsed.
    ///
    /// Backends that expire entries on their own may return `Ok(0)` most of
    /// the time; the method exists for backends that cannot schedule expiry.
    async fn cleanup_expired(&self) -> Result<usize, NonceError>;

    /// Returns statistics about the storage backend.
    async fn get_stats(&self) -> Result<StorageStats, NonceError>;
}
