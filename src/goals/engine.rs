//! Goal progress engine
//!
//! Evaluates one goal for one date:
//!
//! 1. Serve a fresh cached snapshot if there is one.
//! 2. Otherwise measure progress with the goal type's formula.
//! 3. `is_achieved = progress >= target`; write the snapshot to the cache.
//! 4. If achieved and the goal is still active, win the active -> completed
//!    transition and append an achievement. Losers of a concurrent race see
//!    the goal already completed and record nothing.

use crate::aggregates::DayAggregates;
use crate::clock::Clock;
use crate::config::GoalsConfig;
use crate::dates::{start_of_week, window_ending};
use crate::error::Result;
use crate::goals::cache::ProgressCache;
use crate::goals::ledger::AchievementLedger;
use crate::goals::registry::GoalRegistry;
use crate::goals::streak::compute_streak;
use crate::storage::KvStore;
use crate::types::{Goal, GoalAchievement, GoalProgress, GoalStatus, GoalType};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};

/// Days summed by `weekly_score` goals
pub const WEEKLY_WINDOW_DAYS: u32 = 7;

/// Outcome of one evaluation
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub progress: GoalProgress,

    /// Set only for the evaluation that completed the goal
    pub achievement: Option<GoalAchievement>,
}

#[derive(Clone)]
pub struct GoalEngine {
    aggregates: DayAggregates,
    registry: GoalRegistry,
    cache: ProgressCache,
    ledger: AchievementLedger,
    clock: Arc<dyn Clock>,
    streak_lookback_days: u32,
}

impl GoalEngine {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: &GoalsConfig) -> Self {
        Self {
            aggregates: DayAggregates::new(store.clone(), clock.clone()),
            registry: GoalRegistry::new(store.clone(), clock.clone()),
            cache: ProgressCache::new(store.clone(), clock.clone(), config.progress_ttl),
            ledger: AchievementLedger::new(store, clock.clone()),
            clock,
            streak_lookback_days: config.streak_lookback_days,
        }
    }

    pub fn aggregates(&self) -> &DayAggregates {
        &self.aggregates
    }

    pub fn registry(&self) -> &GoalRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &AchievementLedger {
        &self.ledger
    }

    /// Progress of `goal` on `date`, recording an achievement on the first crossing
    pub async fn compute_goal_progress(&self, goal: &Goal, date: NaiveDate) -> Result<GoalProgress> {
        Ok(self.evaluate(goal, date).await?.progress)
    }

    pub async fn evaluate(&self, goal: &Goal, date: NaiveDate) -> Result<Evaluation> {
        if let Some(cached) = self.cache.get_fresh(goal.id, date).await? {
            return Ok(Evaluation {
                progress: cached,
                achievement: None,
            });
        }

        let value = self.measure(goal, date).await?;
        let progress = GoalProgress {
            goal_id: goal.id,
            date,
            progress: value,
            is_achieved: value >= goal.target,
            checked_at: self.clock.now(),
        };
        self.cache.put(&progress).await?;

        debug!(
            "Goal {} ({}) on {}: progress {} / target {}",
            goal.id, goal.goal_type, date, value, goal.target
        );

        let achievement = if progress.is_achieved && goal.status == GoalStatus::Active {
            self.complete(goal, &progress).await?
        } else {
            None
        };

        Ok(Evaluation {
            progress,
            achievement,
        })
    }

    async fn complete(&self, goal: &Goal, progress: &GoalProgress) -> Result<Option<GoalAchievement>> {
        let Some(transition) = self
            .registry
            .try_complete(goal.id, progress.checked_at)
            .await?
        else {
            return Ok(None);
        };

        let achievement = self
            .ledger
            .record(&transition.before, progress.date, progress.progress)
            .await?;
        Ok(Some(achievement))
    }

    /// Raw metric value for `goal` as of `date`, bypassing cache and side effects
    pub async fn measure(&self, goal: &Goal, date: NaiveDate) -> Result<f64> {
        let value = match goal.goal_type {
            GoalType::DailyScore => self.aggregates.daily_score(date).await? as f64,

            GoalType::WeeklyScore => {
                let (start, end) = window_ending(date, WEEKLY_WINDOW_DAYS);
                self.aggregates
                    .daily_scores(start, end)
                    .await?
                    .iter()
                    .map(|s| s.score)
                    .sum::<i64>() as f64
            }

            GoalType::Streak => {
                compute_streak(&self.aggregates, date, self.streak_lookback_days).await? as f64
            }

            // Always the current Sunday-based week, whatever `period` says
            GoalType::HabitCount => match goal.habit_id.as_deref() {
                Some(habit_id) => self
                    .aggregates
                    .habit_count_for_period(habit_id, start_of_week(date), date)
                    .await? as f64,
                None => {
                    warn!("habit_count goal {} has no habit id", goal.id);
                    0.0
                }
            },

            GoalType::TodoCompletion => {
                self.aggregates
                    .todo_completion_rate(goal.start_date, date)
                    .await?
            }

            GoalType::HabitFrequency => {
                self.aggregates
                    .healthy_habit_count(goal.start_date, date)
                    .await? as f64
            }

            GoalType::Unknown => {
                warn!("Goal {} has an unrecognized type, reporting no progress", goal.id);
                0.0
            }
        };
        Ok(value)
    }
}
