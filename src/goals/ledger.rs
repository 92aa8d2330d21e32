//! Achievement ledger
//!
//! Append-only: one immutable record per completed goal, plus an id index
//! under `achievements`. The ledger does not guard against duplicates on its
//! own; callers record only after winning the goal's completion transition
//! (see [`crate::goals::GoalRegistry::try_complete`]).

use crate::clock::Clock;
use crate::error::Result;
use crate::storage::{keys, set_json, KvStore};
use crate::types::{AchievementId, Goal, GoalAchievement, GoalId};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AchievementLedger {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl AchievementLedger {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Append an achievement for `snapshot`
    pub async fn record(
        &self,
        snapshot: &Goal,
        achieved_date: NaiveDate,
        final_progress: f64,
    ) -> Result<GoalAchievement> {
        let achievement = GoalAchievement {
            id: AchievementId::new(),
            goal_id: snapshot.id,
            achieved_date,
            achieved_at: self.clock.now(),
            final_progress,
            goal_snapshot: snapshot.clone(),
        };

        // Record first so the index never points at nothing
        set_json(
            self.store.as_ref(),
            &keys::achievement(achievement.id),
            &achievement,
            None,
        )
        .await?;
        self.store
            .set_add(keys::ACHIEVEMENTS, &achievement.id.to_string())
            .await?;

        info!(
            "Goal '{}' achieved on {} with progress {}",
            snapshot.title, achieved_date, final_progress
        );
        Ok(achievement)
    }

    /// Every recorded achievement, newest first
    pub async fn history(&self) -> Result<Vec<GoalAchievement>> {
        let ids = self.store.set_members(keys::ACHIEVEMENTS).await?;
        let record_keys: Vec<String> = ids.iter().map(|id| keys::achievement_member(id)).collect();
        let records = self.store.batch_get(&record_keys).await?;

        let mut achievements = Vec::with_capacity(records.len());
        for (id, raw) in ids.iter().zip(records) {
            let Some(raw) = raw else { continue };
            match serde_json::from_str::<GoalAchievement>(&raw) {
                Ok(achievement) => achievements.push(achievement),
                Err(e) => warn!("Skipping unreadable achievement {}: {}", id, e),
            }
        }

        achievements.sort_by(|a, b| b.achieved_at.cmp(&a.achieved_at));
        Ok(achievements)
    }

    pub async fn for_goal(&self, goal_id: GoalId) -> Result<Vec<GoalAchievement>> {
        Ok(self
            .history()
            .await?
            .into_iter()
            .filter(|a| a.goal_id == goal_id)
            .collect())
    }
}
