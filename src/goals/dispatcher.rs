//! Relevance dispatcher
//!
//! After a mutation, re-evaluates only the active goals whose metric can have
//! moved. There is no scheduler: this is the only path by which a todo toggle
//! or a habit log advances goal state.

use crate::error::Result;
use crate::goals::engine::GoalEngine;
use crate::types::{Goal, GoalAchievement, TriggerType};
use chrono::NaiveDate;
use tracing::{debug, info};

/// Goals from `goals` whose progress can change after a `trigger` mutation
pub fn relevant_goals(goals: Vec<Goal>, trigger: TriggerType) -> Vec<Goal> {
    goals
        .into_iter()
        .filter(|g| g.goal_type.is_affected_by(trigger))
        .collect()
}

impl GoalEngine {
    /// Evaluate every relevant active goal for `date`; returns the achievements this call produced
    pub async fn check_relevant_goals(
        &self,
        date: NaiveDate,
        trigger: TriggerType,
    ) -> Result<Vec<GoalAchievement>> {
        let active = self.registry().active_goals().await?;
        let total = active.len();
        let goals = relevant_goals(active, trigger);
        debug!(
            "{} trigger on {}: {} of {} active goals relevant",
            trigger,
            date,
            goals.len(),
            total
        );

        let mut achievements = Vec::new();
        for goal in &goals {
            if let Some(achievement) = self.evaluate(goal, date).await?.achievement {
                achievements.push(achievement);
            }
        }

        if !achievements.is_empty() {
            info!("{} goal(s) achieved on {}", achievements.len(), date);
        }
        Ok(achievements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::GoalsConfig;
    use crate::dates::parse_date;
    use crate::storage::{keys, KvStore, MemoryStore};
    use crate::types::{GoalPeriod, GoalType, NewGoal};
    use chrono::Utc;
    use std::sync::Arc;

    fn new_goal(goal_type: GoalType, target: f64) -> NewGoal {
        NewGoal {
            goal_type,
            title: goal_type.to_string(),
            description: None,
            target,
            period: GoalPeriod::Daily,
            start_date: parse_date("2024-03-01").unwrap(),
            end_date: None,
            habit_id: goal_type.requires_habit().then(|| "habit_leer".to_string()),
        }
    }

    #[test]
    fn test_relevance_filter() {
        let now = Utc::now();
        let goal = |goal_type| Goal {
            id: crate::types::GoalId::new(),
            goal_type,
            title: "g".to_string(),
            description: None,
            target: 1.0,
            period: GoalPeriod::Daily,
            start_date: parse_date("2024-03-01").unwrap(),
            end_date: None,
            habit_id: None,
            status: crate::types::GoalStatus::Active,
            created_at: now,
            updated_at: now,
            achieved_at: None,
        };
        let all = vec![
            goal(GoalType::DailyScore),
            goal(GoalType::WeeklyScore),
            goal(GoalType::Streak),
            goal(GoalType::HabitCount),
            goal(GoalType::TodoCompletion),
            goal(GoalType::HabitFrequency),
        ];

        let habit = relevant_goals(all.clone(), TriggerType::Habit);
        assert_eq!(habit.len(), 5);
        assert!(habit.iter().all(|g| g.goal_type != GoalType::TodoCompletion));

        let todo = relevant_goals(all.clone(), TriggerType::Todo);
        assert_eq!(todo.len(), 1);
        assert_eq!(todo[0].goal_type, GoalType::TodoCompletion);

        assert_eq!(relevant_goals(all, TriggerType::Score).len(), 6);
    }

    #[tokio::test]
    async fn test_todo_trigger_skips_score_goals() {
        let store = Arc::new(MemoryStore::new());
        let engine = GoalEngine::new(
            store.clone(),
            Arc::new(ManualClock::new(Utc::now())),
            &GoalsConfig::default(),
        );
        let day = parse_date("2024-03-10").unwrap();
        store.set(&keys::score(day), "20", None).await.unwrap();

        let daily = engine
            .registry()
            .create(new_goal(GoalType::DailyScore, 10.0))
            .await
            .unwrap();

        let achieved = engine
            .check_relevant_goals(day, TriggerType::Todo)
            .await
            .unwrap();
        assert!(achieved.is_empty());

        let achieved = engine
            .check_relevant_goals(day, TriggerType::Habit)
            .await
            .unwrap();
        assert_eq!(achieved.len(), 1);
        assert_eq!(achieved[0].goal_id, daily.id);

        // Completed goals are no longer active, so nothing fires twice
        let achieved = engine
            .check_relevant_goals(day, TriggerType::Score)
            .await
            .unwrap();
        assert!(achieved.is_empty());
    }
}
