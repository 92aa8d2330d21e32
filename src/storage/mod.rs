//! Storage layer for the Daytrack tracker
//!
//! Everything the tracker persists goes through [`KvStore`], a small
//! key-value contract: single-key get/set/delete/increment, pipelined batch
//! reads, an atomic compare-and-swap, and set-valued keys for id indexes.
//! Values are opaque strings; the typed helpers below encode records as JSON.

pub mod keys;
pub mod libsql;
pub mod memory;

use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub use self::libsql::{ConnectionMode, LibsqlStore};
pub use self::memory::MemoryStore;

/// Key-value store contract
///
/// Every method is atomic with respect to its own key. Nothing is atomic
/// across keys; callers that need a guarded multi-key update must funnel the
/// decision through `compare_and_swap` on a single key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value; expired entries read as absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one (and its expiry)
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Remove a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Add `delta` to an integer value (absent counts as 0) and return the result
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Read many keys in one round trip; output matches `keys` in length and order
    async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Replace the value only if it currently equals `expected`
    async fn compare_and_swap(&self, key: &str, expected: &str, new: &str) -> Result<bool>;

    /// Add a member to a set; returns false if it was already present
    async fn set_add(&self, key: &str, member: &str) -> Result<bool>;

    /// Remove a member from a set; returns false if it was not present
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool>;

    /// All members of a set, sorted
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    /// Read/write round trip against the backend
    async fn ping(&self) -> Result<()>;
}

/// Read and decode a JSON record
pub async fn get_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON record
pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw, ttl).await
}

/// Batch-read and decode JSON records, preserving key order
pub async fn batch_get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    keys: &[String],
) -> Result<Vec<Option<T>>> {
    store
        .batch_get(keys)
        .await?
        .into_iter()
        .map(|raw| match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        })
        .collect()
}
