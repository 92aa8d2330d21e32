//! Goal tracking
//!
//! - [`registry`]: goal records, lifecycle transitions, id indexes
//! - [`engine`]: progress formulas, cache policy, achievement side effect
//! - [`streak`]: consecutive positive-score days
//! - [`cache`]: per (goal, date) progress snapshots
//! - [`ledger`]: immutable achievement history
//! - [`dispatcher`]: trigger-based re-evaluation after mutations

pub mod cache;
pub mod dispatcher;
pub mod engine;
pub mod ledger;
pub mod registry;
pub mod streak;

pub use cache::ProgressCache;
pub use dispatcher::relevant_goals;
pub use engine::{Evaluation, GoalEngine};
pub use ledger::AchievementLedger;
pub use registry::{GoalRegistry, Transition, TransitionOutcome, MAX_TRANSITION_ATTEMPTS};
pub use streak::{compute_streak, streak_from_scores};
