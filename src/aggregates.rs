//! Day aggregates: todos, habit events, scores and notes
//!
//! Each calendar day owns four keys (see [`crate::storage::keys`]). The read
//! side below is what the goal engine consumes: range queries that treat a
//! missing day as "nothing recorded" rather than an error. The write side is
//! the CRUD layer used by [`crate::tracker::Tracker`].

use crate::clock::Clock;
use crate::dates::days_inclusive;
use crate::error::{DaytrackError, Result};
use crate::habits::merge_definitions;
use crate::storage::{batch_get_json, get_json, keys, set_json, KvStore};
use crate::types::{
    DailyNote, DailyScore, HabitDefinition, HabitEvent, HabitKind, Todo, TodoStatus,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Repository over the per-day keys
#[derive(Clone)]
pub struct DayAggregates {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl DayAggregates {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    // === Read side (range queries) ===

    /// Score of one day; 0 when nothing was logged
    pub async fn daily_score(&self, date: NaiveDate) -> Result<i64> {
        match self.store.get(&keys::score(date)).await? {
            Some(raw) => parse_score(&keys::score(date), &raw),
            None => Ok(0),
        }
    }

    /// One entry per day from `start` through `end`, read in a single batch
    pub async fn daily_scores(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyScore>> {
        let dates = days_inclusive(start, end);
        if dates.is_empty() {
            return Ok(Vec::new());
        }

        let score_keys: Vec<String> = dates.iter().map(|d| keys::score(*d)).collect();
        let values = self.store.batch_get(&score_keys).await?;

        dates
            .into_iter()
            .zip(score_keys.iter().zip(values))
            .map(|(date, (key, raw))| {
                let score = match raw {
                    Some(raw) => parse_score(key, &raw)?,
                    None => 0,
                };
                Ok(DailyScore { date, score })
            })
            .collect()
    }

    /// All todos stored for the days in range (recurring templates are not materialized)
    pub async fn todos_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Todo>> {
        let todo_keys: Vec<String> = days_inclusive(start, end)
            .into_iter()
            .map(keys::todos)
            .collect();
        if todo_keys.is_empty() {
            return Ok(Vec::new());
        }

        let days: Vec<Option<Vec<Todo>>> = batch_get_json(self.store.as_ref(), &todo_keys).await?;
        Ok(days.into_iter().flatten().flatten().collect())
    }

    pub async fn habit_events_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitEvent>> {
        let event_keys: Vec<String> = days_inclusive(start, end)
            .into_iter()
            .map(keys::habits)
            .collect();
        if event_keys.is_empty() {
            return Ok(Vec::new());
        }

        let days: Vec<Option<Vec<HabitEvent>>> =
            batch_get_json(self.store.as_ref(), &event_keys).await?;
        Ok(days.into_iter().flatten().flatten().collect())
    }

    /// Number of events of one habit in range
    pub async fn habit_count_for_period(
        &self,
        habit_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u32> {
        let events = self.habit_events_in_range(start, end).await?;
        Ok(events.iter().filter(|e| e.habit_id == habit_id).count() as u32)
    }

    /// Percentage (0-100) of done todos in range; 0 when there are none
    pub async fn todo_completion_rate(&self, start: NaiveDate, end: NaiveDate) -> Result<f64> {
        let todos = self.todos_in_range(start, end).await?;
        if todos.is_empty() {
            return Ok(0.0);
        }

        let done = todos.iter().filter(|t| t.status == TodoStatus::Done).count();
        Ok(done as f64 * 100.0 / todos.len() as f64)
    }

    /// Events in range whose habit is defined as healthy
    ///
    /// Events referring to a habit with no definition are not counted.
    pub async fn healthy_habit_count(&self, start: NaiveDate, end: NaiveDate) -> Result<u32> {
        let kinds: HashMap<String, HabitKind> = self
            .habit_definitions()
            .await?
            .into_iter()
            .map(|h| (h.id, h.kind))
            .collect();

        let events = self.habit_events_in_range(start, end).await?;
        Ok(events
            .iter()
            .filter(|e| kinds.get(&e.habit_id) == Some(&HabitKind::Healthy))
            .count() as u32)
    }

    // === Todos ===

    /// Todos of one day, materializing recurring templates on first access
    pub async fn get_todos(&self, date: NaiveDate) -> Result<Vec<Todo>> {
        self.ensure_recurring_todos(date).await?;
        Ok(get_json(self.store.as_ref(), &keys::todos(date))
            .await?
            .unwrap_or_default())
    }

    /// Insert or replace a todo (matched by id)
    pub async fn save_todo(&self, date: NaiveDate, todo: Todo) -> Result<()> {
        let mut todos = self.get_todos(date).await?;
        match todos.iter_mut().find(|t| t.id == todo.id) {
            Some(existing) => *existing = todo,
            None => todos.push(todo),
        }
        set_json(self.store.as_ref(), &keys::todos(date), &todos, None).await
    }

    pub async fn delete_todo(&self, date: NaiveDate, todo_id: Uuid) -> Result<bool> {
        let mut todos = self.get_todos(date).await?;
        let before = todos.len();
        todos.retain(|t| t.id != todo_id);
        if todos.len() == before {
            return Ok(false);
        }
        set_json(self.store.as_ref(), &keys::todos(date), &todos, None).await?;
        Ok(true)
    }

    /// Change a todo's status; returns false if the todo doesn't exist
    pub async fn set_todo_status(
        &self,
        date: NaiveDate,
        todo_id: Uuid,
        status: TodoStatus,
    ) -> Result<bool> {
        let mut todos = self.get_todos(date).await?;
        let Some(todo) = todos.iter_mut().find(|t| t.id == todo_id) else {
            return Ok(false);
        };
        todo.status = status;
        set_json(self.store.as_ref(), &keys::todos(date), &todos, None).await?;
        Ok(true)
    }

    pub async fn add_recurring_template(&self, template: Todo) -> Result<()> {
        let mut templates: Vec<Todo> = get_json(self.store.as_ref(), keys::SETTINGS_RECURRING_TODOS)
            .await?
            .unwrap_or_default();
        templates.push(template);
        set_json(
            self.store.as_ref(),
            keys::SETTINGS_RECURRING_TODOS,
            &templates,
            None,
        )
        .await
    }

    async fn ensure_recurring_todos(&self, date: NaiveDate) -> Result<()> {
        let key = keys::todos(date);
        if self.store.exists(&key).await? {
            return Ok(());
        }

        let templates: Vec<Todo> = get_json(self.store.as_ref(), keys::SETTINGS_RECURRING_TODOS)
            .await?
            .unwrap_or_default();
        if templates.is_empty() {
            return Ok(());
        }

        let now = self.clock.now();
        let instances: Vec<Todo> = templates
            .into_iter()
            .map(|t| Todo {
                id: Uuid::new_v4(),
                status: TodoStatus::Pending,
                date,
                created_at: now,
                ..t
            })
            .collect();

        debug!("Materialized {} recurring todos for {}", instances.len(), date);
        set_json(self.store.as_ref(), &key, &instances, None).await
    }

    // === Habits ===

    /// Predefined catalog merged with the user's custom definitions
    pub async fn habit_definitions(&self) -> Result<Vec<HabitDefinition>> {
        let custom: Vec<HabitDefinition> = get_json(self.store.as_ref(), keys::SETTINGS_HABITS)
            .await?
            .unwrap_or_default();
        Ok(merge_definitions(custom))
    }

    /// Insert or replace a custom habit definition (matched by id)
    pub async fn save_habit_definition(&self, habit: HabitDefinition) -> Result<()> {
        let mut custom: Vec<HabitDefinition> = get_json(self.store.as_ref(), keys::SETTINGS_HABITS)
            .await?
            .unwrap_or_default();
        match custom.iter_mut().find(|h| h.id == habit.id) {
            Some(existing) => *existing = habit,
            None => custom.push(habit),
        }
        set_json(self.store.as_ref(), keys::SETTINGS_HABITS, &custom, None).await
    }

    pub async fn habit_events(&self, date: NaiveDate) -> Result<Vec<HabitEvent>> {
        Ok(get_json(self.store.as_ref(), &keys::habits(date))
            .await?
            .unwrap_or_default())
    }

    /// Append an event and add its score snapshot to the day's score
    pub async fn log_habit_event(&self, date: NaiveDate, event: HabitEvent) -> Result<i64> {
        let mut events = self.habit_events(date).await?;
        let delta = event.score_snapshot;
        events.push(event);
        set_json(self.store.as_ref(), &keys::habits(date), &events, None).await?;

        let score = self.store.incr_by(&keys::score(date), delta).await?;
        debug!("Logged habit on {} ({:+}), day score now {}", date, delta, score);
        Ok(score)
    }

    /// Remove an event and reverse its score contribution
    ///
    /// Returns the removed event, or `None` if no event had that id.
    pub async fn delete_habit_event(
        &self,
        date: NaiveDate,
        event_id: Uuid,
    ) -> Result<Option<HabitEvent>> {
        let mut events = self.habit_events(date).await?;
        let Some(pos) = events.iter().position(|e| e.id == event_id) else {
            return Ok(None);
        };
        let removed = events.remove(pos);
        set_json(self.store.as_ref(), &keys::habits(date), &events, None).await?;

        let score = self
            .store
            .incr_by(&keys::score(date), -removed.score_snapshot)
            .await?;
        debug!("Removed habit event on {}, day score now {}", date, score);
        Ok(Some(removed))
    }

    // === Notes ===

    pub async fn daily_note(&self, date: NaiveDate) -> Result<Option<DailyNote>> {
        get_json(self.store.as_ref(), &keys::notes(date)).await
    }

    pub async fn save_daily_note(&self, date: NaiveDate, content: &str) -> Result<DailyNote> {
        let note = DailyNote {
            date,
            content: content.to_string(),
            updated_at: self.clock.now(),
        };
        set_json(self.store.as_ref(), &keys::notes(date), &note, None).await?;
        Ok(note)
    }
}

fn parse_score(key: &str, raw: &str) -> Result<i64> {
    raw.trim().parse::<i64>().map_err(|_| {
        DaytrackError::Database(format!("Score at '{}' is not an integer: {}", key, raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::dates::parse_date;
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn aggregates() -> (Arc<MemoryStore>, DayAggregates) {
        let store = Arc::new(MemoryStore::new());
        let aggregates = DayAggregates::new(store.clone(), Arc::new(SystemClock));
        (store, aggregates)
    }

    fn todo(date: NaiveDate, status: TodoStatus) -> Todo {
        Todo {
            id: Uuid::new_v4(),
            title: "task".to_string(),
            status,
            date,
            is_recurring: false,
            created_at: Utc::now(),
        }
    }

    fn event(date: NaiveDate, habit_id: &str, score: i64) -> HabitEvent {
        HabitEvent {
            id: Uuid::new_v4(),
            habit_id: habit_id.to_string(),
            date,
            timestamp: Utc::now(),
            score_snapshot: score,
        }
    }

    #[tokio::test]
    async fn test_missing_scores_read_as_zero() {
        let (store, aggregates) = aggregates();
        store.set("score:day:2024-03-06", "5", None).await.unwrap();

        assert_eq!(aggregates.daily_score(date("2024-03-05")).await.unwrap(), 0);

        let scores = aggregates
            .daily_scores(date("2024-03-04"), date("2024-03-06"))
            .await
            .unwrap();
        assert_eq!(
            scores.iter().map(|s| s.score).collect::<Vec<_>>(),
            vec![0, 0, 5]
        );
        assert_eq!(scores[2].date, date("2024-03-06"));

        assert!(aggregates
            .daily_scores(date("2024-03-06"), date("2024-03-04"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_log_and_delete_habit_adjusts_score() {
        let (_, aggregates) = aggregates();
        let day = date("2024-03-10");

        let first = event(day, "habit_leer", 3);
        let second = event(day, "habit_golosina", -2);
        assert_eq!(aggregates.log_habit_event(day, first.clone()).await.unwrap(), 3);
        assert_eq!(aggregates.log_habit_event(day, second).await.unwrap(), 1);

        let removed = aggregates.delete_habit_event(day, first.id).await.unwrap();
        assert_eq!(removed.map(|e| e.habit_id), Some("habit_leer".to_string()));
        assert_eq!(aggregates.daily_score(day).await.unwrap(), -2);
        assert_eq!(aggregates.habit_events(day).await.unwrap().len(), 1);

        // Unknown id is a no-op
        assert!(aggregates
            .delete_habit_event(day, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
        assert_eq!(aggregates.daily_score(day).await.unwrap(), -2);
    }

    #[tokio::test]
    async fn test_todo_completion_rate() {
        let (_, aggregates) = aggregates();
        let start = date("2024-03-01");
        let end = date("2024-03-05");

        assert_eq!(aggregates.todo_completion_rate(start, end).await.unwrap(), 0.0);

        for i in 0..10 {
            let day = date("2024-03-02") + chrono::Duration::days(i % 3);
            let status = if i < 3 { TodoStatus::Done } else { TodoStatus::Pending };
            aggregates.save_todo(day, todo(day, status)).await.unwrap();
        }

        assert_eq!(aggregates.todo_completion_rate(start, end).await.unwrap(), 30.0);
    }

    #[tokio::test]
    async fn test_todo_status_and_delete() {
        let (_, aggregates) = aggregates();
        let day = date("2024-03-10");
        let item = todo(day, TodoStatus::Pending);
        aggregates.save_todo(day, item.clone()).await.unwrap();

        assert!(aggregates
            .set_todo_status(day, item.id, TodoStatus::Done)
            .await
            .unwrap());
        assert!(!aggregates
            .set_todo_status(day, Uuid::new_v4(), TodoStatus::Done)
            .await
            .unwrap());
        assert_eq!(
            aggregates.get_todos(day).await.unwrap()[0].status,
            TodoStatus::Done
        );

        assert!(aggregates.delete_todo(day, item.id).await.unwrap());
        assert!(!aggregates.delete_todo(day, item.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_recurring_templates_materialize_once() {
        let (_, aggregates) = aggregates();
        let mut template = todo(date("2024-03-01"), TodoStatus::Done);
        template.is_recurring = true;
        template.title = "Stretch".to_string();
        aggregates.add_recurring_template(template.clone()).await.unwrap();

        let day = date("2024-03-10");
        let todos = aggregates.get_todos(day).await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "Stretch");
        assert_eq!(todos[0].status, TodoStatus::Pending);
        assert_eq!(todos[0].date, day);
        assert_ne!(todos[0].id, template.id);

        // Second read keeps the same instance
        let again = aggregates.get_todos(day).await.unwrap();
        assert_eq!(again, todos);
    }

    #[tokio::test]
    async fn test_habit_counts() {
        let (_, aggregates) = aggregates();
        let d1 = date("2024-03-10");
        let d2 = date("2024-03-11");
        aggregates.log_habit_event(d1, event(d1, "habit_leer", 3)).await.unwrap();
        aggregates.log_habit_event(d2, event(d2, "habit_leer", 3)).await.unwrap();
        aggregates.log_habit_event(d2, event(d2, "habit_alcohol", -4)).await.unwrap();
        aggregates.log_habit_event(d2, event(d2, "habit_mystery", 1)).await.unwrap();

        assert_eq!(
            aggregates.habit_count_for_period("habit_leer", d1, d2).await.unwrap(),
            2
        );
        assert_eq!(
            aggregates.habit_count_for_period("habit_leer", d2, d2).await.unwrap(),
            1
        );
        // Only the two "Leer" events are healthy; the undefined habit is ignored
        assert_eq!(aggregates.healthy_habit_count(d1, d2).await.unwrap(), 2);

        aggregates
            .save_habit_definition(HabitDefinition {
                id: "habit_mystery".to_string(),
                name: "Mystery".to_string(),
                kind: HabitKind::Healthy,
                score: 1,
                icon: None,
            })
            .await
            .unwrap();
        assert_eq!(aggregates.healthy_habit_count(d1, d2).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_notes() {
        let (_, aggregates) = aggregates();
        let day = date("2024-03-10");
        assert!(aggregates.daily_note(day).await.unwrap().is_none());

        aggregates.save_daily_note(day, "Good day").await.unwrap();
        aggregates.save_daily_note(day, "Great day").await.unwrap();
        assert_eq!(
            aggregates.daily_note(day).await.unwrap().map(|n| n.content),
            Some("Great day".to_string())
        );
    }
}
