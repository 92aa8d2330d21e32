//! In-process key-value store
//!
//! Backs tests and the `memory` backend. Each operation holds the map lock
//! for its whole read-modify-write, which gives the same per-key atomicity
//! the libSQL backend gets from single statements.

use crate::error::{DaytrackError, Result};
use crate::storage::KvStore;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Thread-safe map-backed store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Entry>>,
    sets: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) plain values
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.values
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let values = self.values.read().await;
        Ok(values
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.values.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let removed_value = self
            .values
            .write()
            .await
            .remove(key)
            .map_or(false, |e| e.is_live(now));
        let removed_set = self.sets.write().await.remove(key).is_some();
        Ok(removed_value || removed_set)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let now = Instant::now();
        let mut values = self.values.write().await;

        let (current, expires_at) = match values.get(key).filter(|e| e.is_live(now)) {
            Some(entry) => {
                let current = entry.value.trim().parse::<i64>().map_err(|_| {
                    DaytrackError::Database(format!("Value at '{}' is not an integer", key))
                })?;
                (current, entry.expires_at)
            }
            None => (0, None),
        };

        let updated = current.checked_add(delta).ok_or_else(|| {
            DaytrackError::Database(format!("Value at '{}' would overflow", key))
        })?;
        values.insert(
            key.to_string(),
            Entry {
                value: updated.to_string(),
                expires_at,
            },
        );
        debug!("incr_by {} {:+} -> {}", key, delta, updated);
        Ok(updated)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        if self
            .values
            .read()
            .await
            .get(key)
            .map_or(false, |e| e.is_live(now))
        {
            return Ok(true);
        }
        Ok(self
            .sets
            .read()
            .await
            .get(key)
            .map_or(false, |members| !members.is_empty()))
    }

    async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let now = Instant::now();
        let values = self.values.read().await;
        Ok(keys
            .iter()
            .map(|key| {
                values
                    .get(key)
                    .filter(|e| e.is_live(now))
                    .map(|e| e.value.clone())
            })
            .collect())
    }

    async fn compare_and_swap(&self, key: &str, expected: &str, new: &str) -> Result<bool> {
        let now = Instant::now();
        let mut values = self.values.write().await;
        match values.get_mut(key) {
            Some(entry) if entry.is_live(now) && entry.value == expected => {
                entry.value = new.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self
            .sets
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut sets = self.sets.write().await;
        Ok(sets.get_mut(key).map_or(false, |members| members.remove(member)))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .sets
            .read()
            .await
            .get(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_set_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v1", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));
        assert!(store.exists("k").await.unwrap());

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = MemoryStore::new();
        store
            .set("short", "v", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        store.set("long", "v", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(!store.exists("short").await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_incr_by() {
        let store = MemoryStore::new();
        assert_eq!(store.incr_by("score", 4).await.unwrap(), 4);
        assert_eq!(store.incr_by("score", -6).await.unwrap(), -2);
        assert_eq!(store.get("score").await.unwrap().as_deref(), Some("-2"));

        store.set("text", "hello", None).await.unwrap();
        assert!(store.incr_by("text", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_incr_by_overflow_is_an_error() {
        let store = MemoryStore::new();
        store.set("score", &i64::MAX.to_string(), None).await.unwrap();
        assert!(matches!(
            store.incr_by("score", 1).await,
            Err(DaytrackError::Database(_))
        ));
        assert_eq!(
            store.get("score").await.unwrap(),
            Some(i64::MAX.to_string())
        );
        assert_eq!(store.incr_by("score", -1).await.unwrap(), i64::MAX - 1);
    }

    #[tokio::test]
    async fn test_batch_get_preserves_order() {
        let store = MemoryStore::new();
        store.set("a", "1", None).await.unwrap();
        store.set("c", "3", None).await.unwrap();

        let keys = vec!["c".to_string(), "b".to_string(), "a".to_string()];
        let values = store.batch_get(&keys).await.unwrap();
        assert_eq!(
            values,
            vec![Some("3".to_string()), None, Some("1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = MemoryStore::new();
        assert!(!store.compare_and_swap("k", "old", "new").await.unwrap());

        store.set("k", "old", None).await.unwrap();
        assert!(!store.compare_and_swap("k", "other", "new").await.unwrap());
        assert!(store.compare_and_swap("k", "old", "new").await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
        assert!(!store.compare_and_swap("k", "old", "newer").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_cas_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        store.set("goal", "active", None).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .compare_and_swap("goal", "active", &format!("completed-{}", i))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_sets() {
        let store = MemoryStore::new();
        assert!(store.set_add("ids", "b").await.unwrap());
        assert!(store.set_add("ids", "a").await.unwrap());
        assert!(!store.set_add("ids", "a").await.unwrap());

        assert_eq!(store.set_members("ids").await.unwrap(), vec!["a", "b"]);
        assert!(store.set_remove("ids", "a").await.unwrap());
        assert!(!store.set_remove("ids", "a").await.unwrap());
        assert_eq!(store.set_members("ids").await.unwrap(), vec!["b"]);
        assert!(store.set_members("missing").await.unwrap().is_empty());
    }
}
