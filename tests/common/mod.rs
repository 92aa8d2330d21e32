//! Common test utilities and helpers

#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};
use daytrack_core::{
    dates::parse_date, GoalPeriod, GoalType, GoalsConfig, LibsqlStore, ManualClock, MemoryStore,
    NewGoal, Tracker,
};
use std::sync::Arc;
use tempfile::TempDir;

pub fn date(s: &str) -> NaiveDate {
    parse_date(s).expect("valid test date")
}

/// Clock pinned to noon UTC of `day`
pub fn clock_at(day: &str) -> Arc<ManualClock> {
    let noon = date(day).and_hms_opt(12, 0, 0).expect("valid time");
    Arc::new(ManualClock::new(Utc.from_utc_datetime(&noon)))
}

/// Create a file-backed libSQL store inside a fresh temp dir
///
/// The `TempDir` must outlive the store.
pub async fn create_test_store() -> (TempDir, Arc<LibsqlStore>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("daytrack.db");
    let store = LibsqlStore::new_local(&path.to_string_lossy())
        .await
        .expect("Failed to create test store");
    (dir, Arc::new(store))
}

/// Reopen the database file of a store created by `create_test_store`
pub async fn reopen_test_store(dir: &TempDir) -> Arc<LibsqlStore> {
    let path = dir.path().join("daytrack.db");
    Arc::new(
        LibsqlStore::new_local(&path.to_string_lossy())
            .await
            .expect("Failed to reopen test store"),
    )
}

pub fn memory_tracker(clock: Arc<ManualClock>) -> Tracker {
    Tracker::new(Arc::new(MemoryStore::new()), clock, &GoalsConfig::default())
}

pub fn new_goal(goal_type: GoalType, title: &str, target: f64, start: &str) -> NewGoal {
    NewGoal {
        goal_type,
        title: title.to_string(),
        description: None,
        target,
        period: GoalPeriod::Weekly,
        start_date: date(start),
        end_date: None,
        habit_id: None,
    }
}
