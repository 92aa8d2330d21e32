//! Store key layout
//!
//! Day aggregates are addressed by `<kind>:day:<YYYY-MM-DD>`; goal records,
//! progress snapshots and achievements by id.

use crate::dates::format_date;
use crate::types::{AchievementId, GoalId};
use chrono::NaiveDate;

pub const SETTINGS_HABITS: &str = "settings:habits";
pub const SETTINGS_RECURRING_TODOS: &str = "settings:recurring_todos";

pub const GOALS_ACTIVE: &str = "goals:active";
pub const GOALS_COMPLETED: &str = "goals:completed";
pub const GOALS_ARCHIVED: &str = "goals:archived";

pub const ACHIEVEMENTS: &str = "achievements";

pub fn todos(date: NaiveDate) -> String {
    format!("todo:day:{}", format_date(date))
}

pub fn habits(date: NaiveDate) -> String {
    format!("habit:day:{}", format_date(date))
}

pub fn score(date: NaiveDate) -> String {
    format!("score:day:{}", format_date(date))
}

pub fn notes(date: NaiveDate) -> String {
    format!("notes:day:{}", format_date(date))
}

pub fn goal(id: GoalId) -> String {
    format!("goal:{}", id)
}

/// Record key for an id as stored in a goal index set
pub fn goal_member(member: &str) -> String {
    format!("goal:{}", member)
}

pub fn goal_progress(id: GoalId, date: NaiveDate) -> String {
    format!("goal:progress:{}:{}", id, format_date(date))
}

pub fn achievement(id: AchievementId) -> String {
    format!("achievement:{}", id)
}

pub fn achievement_member(member: &str) -> String {
    format!("achievement:{}", member)
}
