//! Progress cache
//!
//! Memoizes one `GoalProgress` per (goal, date). An entry is served only while
//! `now - checked_at` is inside the freshness window. The store-level TTL is
//! set to the same window so stale snapshots are eventually collected.

use crate::clock::Clock;
use crate::error::Result;
use crate::storage::{get_json, keys, set_json, KvStore};
use crate::types::{GoalId, GoalProgress};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct ProgressCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ProgressCache {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Cached snapshot if it is still fresh
    pub async fn get_fresh(&self, goal_id: GoalId, date: NaiveDate) -> Result<Option<GoalProgress>> {
        let key = keys::goal_progress(goal_id, date);
        let Some(progress) = get_json::<GoalProgress>(self.store.as_ref(), &key).await? else {
            return Ok(None);
        };

        let age = self.clock.now() - progress.checked_at;
        let fresh = match age.to_std() {
            Ok(age) => age < self.ttl,
            // checked_at in the future (clock moved backwards): still fresh
            Err(_) => true,
        };

        if fresh {
            debug!("Progress cache hit for goal {} on {}", goal_id, date);
            Ok(Some(progress))
        } else {
            debug!("Progress cache entry for goal {} on {} is stale", goal_id, date);
            Ok(None)
        }
    }

    pub async fn put(&self, progress: &GoalProgress) -> Result<()> {
        let key = keys::goal_progress(progress.goal_id, progress.date);
        set_json(self.store.as_ref(), &key, progress, Some(self.ttl)).await
    }
}
