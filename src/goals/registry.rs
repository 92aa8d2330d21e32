//! Goal registry
//!
//! One JSON record per goal under `goal:<id>`, plus one id set per lifecycle
//! state. The record is the source of truth; the sets are indexes that are
//! re-checked against the record on every read.
//!
//! Status changes go through [`GoalRegistry::transition`], which swaps the
//! record with compare-and-swap so concurrent evaluators agree on a single
//! winner for the active -> completed edge.

use crate::clock::Clock;
use crate::error::{DaytrackError, Result};
use crate::storage::{keys, KvStore};
use crate::types::{Goal, GoalId, GoalStatus, GoalType, GoalUpdates, NewGoal};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on CAS retries when the record keeps changing underneath us
pub const MAX_TRANSITION_ATTEMPTS: usize = 8;

/// A status change that was applied
#[derive(Debug, Clone)]
pub struct Transition {
    /// Record as stored immediately before the change
    pub before: Goal,
    pub after: Goal,
}

/// Result of attempting a status change
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(Transition),
    /// The goal had already left the active state
    NotActive(GoalStatus),
    Missing,
}

#[derive(Clone)]
pub struct GoalRegistry {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

fn status_set(status: GoalStatus) -> &'static str {
    match status {
        GoalStatus::Active => keys::GOALS_ACTIVE,
        GoalStatus::Completed => keys::GOALS_COMPLETED,
        GoalStatus::Archived => keys::GOALS_ARCHIVED,
    }
}

fn validate_fields(goal_type: GoalType, title: &str, target: f64, habit_id: Option<&str>) -> Result<()> {
    if title.trim().is_empty() {
        return Err(DaytrackError::InvalidOperation(
            "goal title cannot be empty".to_string(),
        ));
    }
    if !target.is_finite() || target <= 0.0 {
        return Err(DaytrackError::InvalidOperation(format!(
            "goal target must be a positive number, got {}",
            target
        )));
    }
    if goal_type == GoalType::Unknown {
        return Err(DaytrackError::InvalidOperation(
            "goal type is not supported".to_string(),
        ));
    }

    let has_habit = habit_id.map_or(false, |h| !h.trim().is_empty());
    if goal_type.requires_habit() && !has_habit {
        return Err(DaytrackError::InvalidOperation(format!(
            "{} goals need a habit id",
            goal_type
        )));
    }
    if !goal_type.requires_habit() && has_habit {
        return Err(DaytrackError::InvalidOperation(format!(
            "{} goals cannot reference a habit",
            goal_type
        )));
    }
    Ok(())
}

/// Rewrite only the lifecycle fields of a stored record
///
/// Fields this build cannot represent, such as a goal type written by a newer
/// version, are carried over as stored.
fn patch_lifecycle(id: GoalId, raw: &str, after: &Goal) -> Result<String> {
    let mut record: serde_json::Value = serde_json::from_str(raw)?;
    let Some(fields) = record.as_object_mut() else {
        return Err(DaytrackError::Database(format!(
            "goal record {} is not a JSON object",
            id
        )));
    };
    fields.insert("status".to_string(), serde_json::to_value(after.status)?);
    fields.insert("updated_at".to_string(), serde_json::to_value(after.updated_at)?);
    fields.insert("achieved_at".to_string(), serde_json::to_value(after.achieved_at)?);
    Ok(record.to_string())
}

impl GoalRegistry {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, new: NewGoal) -> Result<Goal> {
        validate_fields(new.goal_type, &new.title, new.target, new.habit_id.as_deref())?;

        let now = self.clock.now();
        let goal = Goal {
            id: GoalId::new(),
            goal_type: new.goal_type,
            title: new.title.trim().to_string(),
            description: new.description,
            target: new.target,
            period: new.period,
            start_date: new.start_date,
            end_date: new.end_date,
            habit_id: new.habit_id,
            status: GoalStatus::Active,
            created_at: now,
            updated_at: now,
            achieved_at: None,
        };

        let raw = serde_json::to_string(&goal)?;
        self.store.set(&keys::goal(goal.id), &raw, None).await?;
        self.store
            .set_add(keys::GOALS_ACTIVE, &goal.id.to_string())
            .await?;

        info!("Created {} goal {} ({})", goal.goal_type, goal.id, goal.title);
        Ok(goal)
    }

    pub async fn get(&self, id: GoalId) -> Result<Option<Goal>> {
        Ok(self.get_raw(id).await?.map(|(_, goal)| goal))
    }

    /// Like `get`, but a missing goal is an error
    pub async fn require(&self, id: GoalId) -> Result<Goal> {
        self.get(id)
            .await?
            .ok_or_else(|| DaytrackError::GoalNotFound(id.to_string()))
    }

    async fn get_raw(&self, id: GoalId) -> Result<Option<(String, Goal)>> {
        match self.store.get(&keys::goal(id)).await? {
            Some(raw) => {
                let goal = serde_json::from_str(&raw)?;
                Ok(Some((raw, goal)))
            }
            None => Ok(None),
        }
    }

    /// Apply a partial update; lifecycle fields are left untouched
    pub async fn update(&self, id: GoalId, updates: GoalUpdates) -> Result<Goal> {
        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let (raw, mut goal) = self
                .get_raw(id)
                .await?
                .ok_or_else(|| DaytrackError::GoalNotFound(id.to_string()))?;

            updates.clone().apply_to(&mut goal);
            validate_fields(goal.goal_type, &goal.title, goal.target, goal.habit_id.as_deref())?;
            goal.updated_at = self.clock.now();

            let new_raw = serde_json::to_string(&goal)?;
            if self
                .store
                .compare_and_swap(&keys::goal(id), &raw, &new_raw)
                .await?
            {
                debug!("Updated goal {}", id);
                return Ok(goal);
            }
            debug!("Goal {} changed concurrently, retrying update (attempt {})", id, attempt);
        }

        Err(DaytrackError::Database(format!(
            "Goal {} kept changing; update abandoned after {} attempts",
            id, MAX_TRANSITION_ATTEMPTS
        )))
    }

    /// Move an active goal to `to`, atomically with respect to other transitions
    pub async fn transition(
        &self,
        id: GoalId,
        to: GoalStatus,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        if to == GoalStatus::Active {
            return Err(DaytrackError::InvalidOperation(
                "goals cannot transition back to active".to_string(),
            ));
        }

        let key = keys::goal(id);
        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let Some((raw, before)) = self.get_raw(id).await? else {
                return Ok(TransitionOutcome::Missing);
            };
            if before.status.is_terminal() {
                return Ok(TransitionOutcome::NotActive(before.status));
            }

            let mut after = before.clone();
            after.status = to;
            after.updated_at = at;
            if to == GoalStatus::Completed {
                after.achieved_at = Some(at);
            }

            let new_raw = patch_lifecycle(id, &raw, &after)?;
            if self.store.compare_and_swap(&key, &raw, &new_raw).await? {
                let member = id.to_string();
                self.store.set_remove(keys::GOALS_ACTIVE, &member).await?;
                self.store.set_add(status_set(to), &member).await?;

                info!("Goal {} transitioned active -> {}", id, to);
                return Ok(TransitionOutcome::Applied(Transition { before, after }));
            }
            debug!("Goal {} changed concurrently, retrying transition (attempt {})", id, attempt);
        }

        Err(DaytrackError::Database(format!(
            "Goal {} kept changing; transition to {} abandoned after {} attempts",
            id, to, MAX_TRANSITION_ATTEMPTS
        )))
    }

    /// The active -> completed edge; `None` unless this caller won it
    pub async fn try_complete(&self, id: GoalId, at: DateTime<Utc>) -> Result<Option<Transition>> {
        match self.transition(id, GoalStatus::Completed, at).await? {
            TransitionOutcome::Applied(transition) => Ok(Some(transition)),
            TransitionOutcome::NotActive(status) => {
                debug!("Goal {} already {}, not completing", id, status);
                Ok(None)
            }
            TransitionOutcome::Missing => {
                debug!("Goal {} disappeared before completion", id);
                Ok(None)
            }
        }
    }

    pub async fn archive(&self, id: GoalId) -> Result<Goal> {
        match self.transition(id, GoalStatus::Archived, self.clock.now()).await? {
            TransitionOutcome::Applied(transition) => Ok(transition.after),
            TransitionOutcome::NotActive(status) => Err(DaytrackError::InvalidOperation(format!(
                "goal {} is {} and cannot be archived",
                id, status
            ))),
            TransitionOutcome::Missing => Err(DaytrackError::GoalNotFound(id.to_string())),
        }
    }

    /// Remove the record and every index entry; achievements keep their snapshot
    pub async fn delete(&self, id: GoalId) -> Result<bool> {
        let existed = self.store.delete(&keys::goal(id)).await?;
        let member = id.to_string();
        for status in [GoalStatus::Active, GoalStatus::Completed, GoalStatus::Archived] {
            self.store.set_remove(status_set(status), &member).await?;
        }
        if existed {
            info!("Deleted goal {}", id);
        }
        Ok(existed)
    }

    pub async fn active_goals(&self) -> Result<Vec<Goal>> {
        self.goals_with_status(GoalStatus::Active).await
    }

    pub async fn completed_goals(&self) -> Result<Vec<Goal>> {
        self.goals_with_status(GoalStatus::Completed).await
    }

    pub async fn archived_goals(&self) -> Result<Vec<Goal>> {
        self.goals_with_status(GoalStatus::Archived).await
    }

    /// Goals indexed under `status` whose record still agrees, oldest first
    async fn goals_with_status(&self, status: GoalStatus) -> Result<Vec<Goal>> {
        let ids = self.store.set_members(status_set(status)).await?;
        let goal_keys: Vec<String> = ids.iter().map(|id| keys::goal_member(id)).collect();
        let records = self.store.batch_get(&goal_keys).await?;

        let mut goals = Vec::with_capacity(records.len());
        for (id, raw) in ids.iter().zip(records) {
            let Some(raw) = raw else {
                debug!("Index {} references missing goal {}", status_set(status), id);
                continue;
            };
            match serde_json::from_str::<Goal>(&raw) {
                Ok(goal) if goal.status == status => goals.push(goal),
                Ok(_) => debug!("Goal {} no longer {}, skipping stale index entry", id, status),
                Err(e) => warn!("Skipping unreadable goal record {}: {}", id, e),
            }
        }

        goals.sort_by_key(|g| g.created_at);
        Ok(goals)
    }
}
