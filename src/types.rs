//! Core data types for the Daytrack tracker
//!
//! This module defines the records the tracker persists: day aggregates
//! (todos, habit events, scores, notes), goals, cached progress snapshots and
//! achievements. Every record is stored as JSON under a string key, so these
//! types are also the on-store format.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for goals
///
/// Wraps a UUID so goal IDs cannot be mixed up with achievement IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalId(pub Uuid);

impl GoalId {
    /// Create a new random goal ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a goal ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for GoalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GoalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for achievements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(pub Uuid);

impl AchievementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AchievementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AchievementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// === Day aggregates ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    Done,
}

impl std::str::FromStr for TodoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TodoStatus::Pending),
            "done" => Ok(TodoStatus::Done),
            other => Err(format!("unknown todo status '{}'", other)),
        }
    }
}

/// A single todo item, scoped to one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub status: TodoStatus,
    pub date: NaiveDate,
    #[serde(default)]
    pub is_recurring: bool,
    pub created_at: DateTime<Utc>,
}

/// Whether logging a habit is good or bad for the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitKind {
    Healthy,
    Unhealthy,
}

impl std::str::FromStr for HabitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HabitKind::Healthy),
            "unhealthy" => Ok(HabitKind::Unhealthy),
            other => Err(format!("unknown habit kind '{}'", other)),
        }
    }
}

/// Habit definition with its score contribution (e.g. +4, -2)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitDefinition {
    pub id: String,
    pub name: String,
    pub kind: HabitKind,
    pub score: i64,
    pub icon: Option<String>,
}

/// One logged occurrence of a habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitEvent {
    pub id: Uuid,
    pub habit_id: String,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,

    /// Score at logging time, so later definition edits don't rewrite history
    pub score_snapshot: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyScore {
    pub date: NaiveDate,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyNote {
    pub date: NaiveDate,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

// === Goals ===

/// Progress metric a goal is measured with
///
/// Each variant maps to exactly one formula in the progress engine. Records
/// written by a newer version with a type this build does not know decode as
/// `Unknown` and evaluate to zero progress instead of failing the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Score of the evaluated day
    DailyScore,

    /// Sum of scores over the 7 days ending on the evaluated day
    WeeklyScore,

    /// Consecutive positive-score days
    Streak,

    /// Occurrences of one habit in the current Sunday-based week
    HabitCount,

    /// Percentage of done todos since the goal started
    TodoCompletion,

    /// Healthy habit events since the goal started
    HabitFrequency,

    #[serde(other)]
    Unknown,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::DailyScore => "daily_score",
            GoalType::WeeklyScore => "weekly_score",
            GoalType::Streak => "streak",
            GoalType::HabitCount => "habit_count",
            GoalType::TodoCompletion => "todo_completion",
            GoalType::HabitFrequency => "habit_frequency",
            GoalType::Unknown => "unknown",
        }
    }

    /// Whether a mutation of the given category can change this goal's progress
    pub fn is_affected_by(&self, trigger: TriggerType) -> bool {
        match trigger {
            TriggerType::Habit => matches!(
                self,
                GoalType::DailyScore
                    | GoalType::WeeklyScore
                    | GoalType::HabitCount
                    | GoalType::HabitFrequency
                    | GoalType::Streak
            ),
            TriggerType::Todo => matches!(self, GoalType::TodoCompletion),
            TriggerType::Score => true,
        }
    }

    pub fn requires_habit(&self) -> bool {
        matches!(self, GoalType::HabitCount)
    }
}

impl std::fmt::Display for GoalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GoalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily_score" => Ok(GoalType::DailyScore),
            "weekly_score" => Ok(GoalType::WeeklyScore),
            "streak" => Ok(GoalType::Streak),
            "habit_count" => Ok(GoalType::HabitCount),
            "todo_completion" => Ok(GoalType::TodoCompletion),
            "habit_frequency" => Ok(GoalType::HabitFrequency),
            other => Err(format!("unknown goal type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl std::str::FromStr for GoalPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(GoalPeriod::Daily),
            "weekly" => Ok(GoalPeriod::Weekly),
            "monthly" => Ok(GoalPeriod::Monthly),
            "custom" => Ok(GoalPeriod::Custom),
            other => Err(format!("unknown goal period '{}'", other)),
        }
    }
}

/// Goal lifecycle: active -> completed | archived; both end states are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Archived,
}

impl GoalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GoalStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-defined target tied to one progress metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    // === Identity ===
    pub id: GoalId,

    #[serde(rename = "type")]
    pub goal_type: GoalType,

    pub title: String,

    pub description: Option<String>,

    // === Target ===
    /// Progress value at or above which the goal is achieved
    pub target: f64,

    pub period: GoalPeriod,

    /// First day counted by cumulative metrics (todo completion, habit frequency)
    pub start_date: NaiveDate,

    pub end_date: Option<NaiveDate>,

    /// Habit counted by `habit_count` goals
    pub habit_id: Option<String>,

    // === Lifecycle ===
    pub status: GoalStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Set once, when the goal transitions to completed
    pub achieved_at: Option<DateTime<Utc>>,
}

/// Fields required to create a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub goal_type: GoalType,
    pub title: String,
    pub description: Option<String>,
    pub target: f64,
    pub period: GoalPeriod,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub habit_id: Option<String>,
}

/// Partial update of an existing goal
///
/// Status and timestamps are owned by the lifecycle transitions and cannot be
/// edited directly. Changing the type to one that counts no habit drops the
/// goal's habit id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GoalUpdates {
    pub goal_type: Option<GoalType>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub target: Option<f64>,
    pub period: Option<GoalPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub habit_id: Option<String>,
}

impl GoalUpdates {
    pub fn apply_to(self, goal: &mut Goal) {
        if let Some(goal_type) = self.goal_type {
            goal.goal_type = goal_type;
        }
        if let Some(title) = self.title {
            goal.title = title;
        }
        if let Some(description) = self.description {
            goal.description = Some(description);
        }
        if let Some(target) = self.target {
            goal.target = target;
        }
        if let Some(period) = self.period {
            goal.period = period;
        }
        if let Some(start_date) = self.start_date {
            goal.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            goal.end_date = Some(end_date);
        }
        if let Some(habit_id) = self.habit_id {
            goal.habit_id = Some(habit_id);
        } else if !goal.goal_type.requires_habit() {
            // Retyped away from habit_count
            goal.habit_id = None;
        }
    }
}

/// Memoized progress of one goal on one date
///
/// Not authoritative: entries go stale after the cache TTL and are recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal_id: GoalId,
    pub date: NaiveDate,
    pub progress: f64,
    pub is_achieved: bool,
    pub checked_at: DateTime<Utc>,
}

/// Immutable record of a goal reaching its target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalAchievement {
    pub id: AchievementId,
    pub goal_id: GoalId,

    /// Date the winning evaluation was run for
    pub achieved_date: NaiveDate,

    pub achieved_at: DateTime<Utc>,

    pub final_progress: f64,

    /// Goal as stored right before it was completed
    pub goal_snapshot: Goal,
}

/// Category of mutation that triggers goal re-evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// A habit event was logged or deleted
    Habit,

    /// A todo changed status
    Todo,

    /// Any other change; every active goal is re-evaluated
    Score,
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerType::Habit => write!(f, "habit"),
            TriggerType::Todo => write!(f, "todo"),
            TriggerType::Score => write!(f, "score"),
        }
    }
}

impl std::str::FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "habit" => Ok(TriggerType::Habit),
            "todo" => Ok(TriggerType::Todo),
            "score" => Ok(TriggerType::Score),
            other => Err(format!("unknown trigger type '{}'", other)),
        }
    }
}
