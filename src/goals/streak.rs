//! Streak calculation
//!
//! Counts consecutive positive-score days walking backwards from the evaluated
//! day. Only `lookback_days` days are read, so longer streaks are reported as
//! the lookback length. That truncation is the existing behavior and is kept.

use crate::aggregates::DayAggregates;
use crate::dates::window_ending;
use crate::error::Result;
use crate::types::DailyScore;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Streak ending on `as_of`, looking back at most `lookback_days` days
pub async fn compute_streak(
    aggregates: &DayAggregates,
    as_of: NaiveDate,
    lookback_days: u32,
) -> Result<u32> {
    let (start, end) = window_ending(as_of, lookback_days.max(1));
    let scores = aggregates.daily_scores(start, end).await?;
    Ok(streak_from_scores(&scores, as_of))
}

/// Walk `scores` newest first:
/// positive days count; a zero on `as_of` is skipped (not logged yet);
/// a zero on any earlier day or any negative day ends the streak.
pub fn streak_from_scores(scores: &[DailyScore], as_of: NaiveDate) -> u32 {
    let mut days: Vec<&DailyScore> = scores.iter().filter(|s| s.date <= as_of).collect();
    days.sort_by(|a, b| b.date.cmp(&a.date));

    let mut streak = 0;
    for day in days {
        match day.score.cmp(&0) {
            Ordering::Greater => streak += 1,
            Ordering::Equal if day.date == as_of => continue,
            Ordering::Equal | Ordering::Less => break,
        }
    }
    streak
}
