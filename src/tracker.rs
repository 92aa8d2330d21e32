//! Tracker facade
//!
//! The mutation layer the CLI talks to. Every write that can move a goal
//! metric is followed by a relevance check with the matching trigger, and
//! the achievements that check produced are handed back to the caller.

use crate::aggregates::DayAggregates;
use crate::clock::Clock;
use crate::config::GoalsConfig;
use crate::error::{DaytrackError, Result};
use crate::goals::{Evaluation, GoalEngine};
use crate::storage::KvStore;
use crate::types::{
    DailyNote, Goal, GoalAchievement, GoalId, GoalUpdates, HabitDefinition, HabitEvent, NewGoal,
    Todo, TodoStatus, TriggerType,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of logging a habit
#[derive(Debug, Clone)]
pub struct HabitLogged {
    pub event: HabitEvent,

    /// Day score after the event was applied
    pub day_score: i64,

    pub achievements: Vec<GoalAchievement>,
}

/// Result of removing a habit event
#[derive(Debug, Clone)]
pub struct HabitUnlogged {
    pub event: HabitEvent,
    pub day_score: i64,
    pub achievements: Vec<GoalAchievement>,
}

/// Active goals with their current progress, plus the achievement history
#[derive(Debug, Clone, Serialize)]
pub struct GoalsOverview {
    pub goals: Vec<Goal>,
    pub achievements: Vec<GoalAchievement>,
    pub progress: BTreeMap<GoalId, f64>,
}

#[derive(Clone)]
pub struct Tracker {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    engine: GoalEngine,
}

impl Tracker {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: &GoalsConfig) -> Self {
        let engine = GoalEngine::new(store.clone(), clock.clone(), config);
        Self {
            store,
            clock,
            engine,
        }
    }

    pub fn engine(&self) -> &GoalEngine {
        &self.engine
    }

    fn days(&self) -> &DayAggregates {
        self.engine.aggregates()
    }

    /// Calendar day according to the tracker's clock
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Backend round trip
    pub async fn verify(&self) -> Result<()> {
        self.store.ping().await
    }

    // === Todos ===

    pub async fn add_todo(&self, date: NaiveDate, title: &str, is_recurring: bool) -> Result<Todo> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DaytrackError::InvalidOperation(
                "todo title cannot be empty".to_string(),
            ));
        }

        let todo = Todo {
            id: Uuid::new_v4(),
            title: title.to_string(),
            status: TodoStatus::Pending,
            date,
            is_recurring,
            created_at: self.clock.now(),
        };
        self.days().save_todo(date, todo.clone()).await?;
        if is_recurring {
            self.days().add_recurring_template(todo.clone()).await?;
        }

        debug!("Added todo {} on {}", todo.id, date);
        Ok(todo)
    }

    pub async fn delete_todo(&self, date: NaiveDate, todo_id: Uuid) -> Result<bool> {
        self.days().delete_todo(date, todo_id).await
    }

    /// Set a todo's status and re-evaluate todo goals
    pub async fn toggle_todo(
        &self,
        date: NaiveDate,
        todo_id: Uuid,
        status: TodoStatus,
    ) -> Result<Vec<GoalAchievement>> {
        if !self.days().set_todo_status(date, todo_id, status).await? {
            return Err(DaytrackError::InvalidOperation(format!(
                "no todo {} on {}",
                todo_id, date
            )));
        }
        self.engine
            .check_relevant_goals(date, TriggerType::Todo)
            .await
    }

    pub async fn todos(&self, date: NaiveDate) -> Result<Vec<Todo>> {
        self.days().get_todos(date).await
    }

    // === Habits ===

    /// Log a habit; `score` defaults to the habit definition's score
    pub async fn log_habit(
        &self,
        date: NaiveDate,
        habit_id: &str,
        score: Option<i64>,
    ) -> Result<HabitLogged> {
        let score = match score {
            Some(score) => score,
            None => self
                .habit_definitions()
                .await?
                .into_iter()
                .find(|h| h.id == habit_id)
                .map(|h| h.score)
                .ok_or_else(|| {
                    DaytrackError::InvalidOperation(format!(
                        "unknown habit '{}'; give a score or define it first",
                        habit_id
                    ))
                })?,
        };

        let event = HabitEvent {
            id: Uuid::new_v4(),
            habit_id: habit_id.to_string(),
            date,
            timestamp: self.clock.now(),
            score_snapshot: score,
        };
        let day_score = self.days().log_habit_event(date, event.clone()).await?;
        let achievements = self
            .engine
            .check_relevant_goals(date, TriggerType::Habit)
            .await?;

        Ok(HabitLogged {
            event,
            day_score,
            achievements,
        })
    }

    /// Save (or replace) a custom habit and log it once
    pub async fn add_habit_definition(
        &self,
        date: NaiveDate,
        habit: HabitDefinition,
    ) -> Result<HabitLogged> {
        if habit.id.trim().is_empty() || habit.name.trim().is_empty() {
            return Err(DaytrackError::InvalidOperation(
                "habit id and name cannot be empty".to_string(),
            ));
        }

        let habit_id = habit.id.clone();
        let score = habit.score;
        self.days().save_habit_definition(habit).await?;
        info!("Saved habit definition {}", habit_id);

        self.log_habit(date, &habit_id, Some(score)).await
    }

    /// Remove a logged event; `None` if there was no such event
    pub async fn delete_habit_event(
        &self,
        date: NaiveDate,
        event_id: Uuid,
    ) -> Result<Option<HabitUnlogged>> {
        let Some(event) = self.days().delete_habit_event(date, event_id).await? else {
            return Ok(None);
        };

        let day_score = self.days().daily_score(date).await?;
        let achievements = self
            .engine
            .check_relevant_goals(date, TriggerType::Habit)
            .await?;

        Ok(Some(HabitUnlogged {
            event,
            day_score,
            achievements,
        }))
    }

    pub async fn habit_events(&self, date: NaiveDate) -> Result<Vec<HabitEvent>> {
        self.days().habit_events(date).await
    }

    pub async fn habit_definitions(&self) -> Result<Vec<HabitDefinition>> {
        self.days().habit_definitions().await
    }

    pub async fn daily_score(&self, date: NaiveDate) -> Result<i64> {
        self.days().daily_score(date).await
    }

    // === Notes ===

    pub async fn save_note(&self, date: NaiveDate, content: &str) -> Result<DailyNote> {
        self.days().save_daily_note(date, content).await
    }

    pub async fn note(&self, date: NaiveDate) -> Result<Option<DailyNote>> {
        self.days().daily_note(date).await
    }

    // === Goals ===

    pub async fn create_goal(&self, new: NewGoal) -> Result<Goal> {
        self.engine.registry().create(new).await
    }

    pub async fn goal(&self, id: GoalId) -> Result<Goal> {
        self.engine.registry().require(id).await
    }

    pub async fn update_goal(&self, id: GoalId, updates: GoalUpdates) -> Result<Goal> {
        self.engine.registry().update(id, updates).await
    }

    pub async fn archive_goal(&self, id: GoalId) -> Result<Goal> {
        self.engine.registry().archive(id).await
    }

    pub async fn delete_goal(&self, id: GoalId) -> Result<bool> {
        self.engine.registry().delete(id).await
    }

    pub async fn archived_goals(&self) -> Result<Vec<Goal>> {
        self.engine.registry().archived_goals().await
    }

    pub async fn completed_goals(&self) -> Result<Vec<Goal>> {
        self.engine.registry().completed_goals().await
    }

    /// Evaluate one stored goal on `date`
    pub async fn goal_progress(&self, goal_id: GoalId, date: NaiveDate) -> Result<Evaluation> {
        let goal = self.goal(goal_id).await?;
        self.engine.evaluate(&goal, date).await
    }

    /// Active goals and their progress on `date`, with the achievement history
    ///
    /// Evaluating can complete a goal; in that case the goal still appears here
    /// (it was active when loaded) and its achievement is part of `achievements`.
    pub async fn goals_overview(&self, date: NaiveDate) -> Result<GoalsOverview> {
        let goals = self.engine.registry().active_goals().await?;

        let mut progress = BTreeMap::new();
        for goal in &goals {
            let evaluation = self.engine.evaluate(goal, date).await?;
            progress.insert(goal.id, evaluation.progress.progress);
        }

        let achievements = self.achievements().await?;
        Ok(GoalsOverview {
            goals,
            achievements,
            progress,
        })
    }

    pub async fn achievements(&self) -> Result<Vec<GoalAchievement>> {
        self.engine.ledger().history().await
    }

    /// Achievements recorded for one goal, including deleted ones
    pub async fn goal_achievements(&self, id: GoalId) -> Result<Vec<GoalAchievement>> {
        self.engine.ledger().for_goal(id).await
    }

    /// Run the relevance check by hand
    pub async fn check(&self, date: NaiveDate, trigger: TriggerType) -> Result<Vec<GoalAchievement>> {
        self.engine.check_relevant_goals(date, trigger).await
    }
}
