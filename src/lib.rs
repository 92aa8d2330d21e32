//! Daytrack - personal daily tracker
//!
//! Todos, habit logging with per-day scores, daily notes, and goals whose
//! progress is evaluated from those day aggregates:
//! - Six progress metrics (daily/weekly score, streak, habit count,
//!   todo completion rate, healthy habit frequency)
//! - One-hour progress cache per (goal, date)
//! - At-most-once achievement recording, guarded by compare-and-swap on the goal
//! - Trigger-based re-evaluation after todo and habit mutations
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Storage**: `KvStore` contract with libSQL and in-memory backends
//! - **Aggregates**: per-day todos, habit events, scores and notes
//! - **Goals**: registry, progress engine, streak, cache, ledger, dispatcher
//! - **Tracker**: mutation facade used by the CLI
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use daytrack_core::{DaytrackConfig, LibsqlStore, SystemClock, Tracker};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DaytrackConfig::from_file("config.toml".as_ref())?;
//!     let store = Arc::new(LibsqlStore::new_local("daytrack.db").await?);
//!     let tracker = Tracker::new(store, Arc::new(SystemClock), &config.goals);
//!
//!     let today = tracker.today();
//!     let logged = tracker.log_habit(today, "habit_leer", None).await?;
//!     for achievement in logged.achievements {
//!         println!("achieved: {}", achievement.goal_snapshot.title);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregates;
pub mod clock;
pub mod config;
pub mod dates;
pub mod error;
pub mod goals;
pub mod habits;
pub mod storage;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use aggregates::DayAggregates;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DaytrackConfig, GoalsConfig, StorageConfig, StoreKind};
pub use error::{DaytrackError, Result};
pub use goals::{AchievementLedger, Evaluation, GoalEngine, GoalRegistry, ProgressCache};
pub use storage::{ConnectionMode, KvStore, LibsqlStore, MemoryStore};
pub use tracker::{GoalsOverview, HabitLogged, HabitUnlogged, Tracker};
pub use types::{
    AchievementId, DailyNote, DailyScore, Goal, GoalAchievement, GoalId, GoalPeriod, GoalProgress,
    GoalStatus, GoalType, GoalUpdates, HabitDefinition, HabitEvent, HabitKind, NewGoal, Todo,
    TodoStatus, TriggerType,
};
