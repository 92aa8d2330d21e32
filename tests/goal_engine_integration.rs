//! Goal engine against the libSQL backend
//!
//! Exercises progress evaluation, the completion transition and the
//! achievement ledger on a real database file, including reopening it.

mod common;

use chrono::Duration;
use common::{clock_at, create_test_store, date, new_goal, reopen_test_store};
use daytrack_core::{
    storage::keys, Clock, GoalEngine, GoalStatus, GoalType, GoalsConfig, KvStore, TriggerType,
};

#[tokio::test]
async fn test_weekly_score_on_libsql() {
    let (_dir, store) = create_test_store().await;
    let clock = clock_at("2024-03-10");
    let engine = GoalEngine::new(store.clone(), clock, &GoalsConfig::default());

    for (offset, score) in [1i64, 0, -1, 2, 3, 0, 4].iter().enumerate() {
        let day = date("2024-03-04") + Duration::days(offset as i64);
        store.incr_by(&keys::score(day), *score).await.unwrap();
    }

    let goal = engine
        .registry()
        .create(new_goal(GoalType::WeeklyScore, "Weekly 9", 9.0, "2024-03-01"))
        .await
        .unwrap();

    let evaluation = engine.evaluate(&goal, date("2024-03-10")).await.unwrap();
    assert_eq!(evaluation.progress.progress, 9.0);
    assert!(evaluation.progress.is_achieved);
    assert!(evaluation.achievement.is_some());
}

#[tokio::test]
async fn test_achievement_survives_reopen() {
    let (dir, store) = create_test_store().await;
    let clock = clock_at("2024-03-10");
    let engine = GoalEngine::new(store.clone(), clock.clone(), &GoalsConfig::default());
    let day = date("2024-03-10");

    let goal = engine
        .registry()
        .create(new_goal(GoalType::DailyScore, "Score 3", 3.0, "2024-03-01"))
        .await
        .unwrap();
    store.incr_by(&keys::score(day), 3).await.unwrap();

    let achieved = engine
        .check_relevant_goals(day, TriggerType::Habit)
        .await
        .unwrap();
    assert_eq!(achieved.len(), 1);
    drop(engine);
    drop(store);

    let store = reopen_test_store(&dir).await;
    let engine = GoalEngine::new(store, clock, &GoalsConfig::default());

    let stored = engine.registry().require(goal.id).await.unwrap();
    assert_eq!(stored.status, GoalStatus::Completed);
    assert!(engine.registry().active_goals().await.unwrap().is_empty());

    let history = engine.ledger().history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].goal_snapshot.title, "Score 3");
    assert_eq!(history[0].goal_snapshot.status, GoalStatus::Active);

    // Re-evaluating the completed goal never records again
    let again = engine.evaluate(&stored, day).await.unwrap();
    assert!(again.achievement.is_none());
    assert_eq!(engine.ledger().history().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cache_expiry_on_libsql() {
    let (_dir, store) = create_test_store().await;
    let clock = clock_at("2024-03-10");
    let engine = GoalEngine::new(store.clone(), clock.clone(), &GoalsConfig::default());
    let day = date("2024-03-10");

    let goal = engine
        .registry()
        .create(new_goal(GoalType::DailyScore, "Score 5", 5.0, "2024-03-01"))
        .await
        .unwrap();

    store.incr_by(&keys::score(day), 2).await.unwrap();
    let first = engine.compute_goal_progress(&goal, day).await.unwrap();
    assert_eq!(first.progress, 2.0);
    assert_eq!(first.checked_at, clock.now());

    store.incr_by(&keys::score(day), 4).await.unwrap();
    clock.advance(Duration::minutes(59));
    let cached = engine.compute_goal_progress(&goal, day).await.unwrap();
    assert_eq!(cached, first);

    clock.advance(Duration::minutes(2));
    let fresh = engine.evaluate(&goal, day).await.unwrap();
    assert_eq!(fresh.progress.progress, 6.0);
    assert!(fresh.achievement.is_some());
}

#[tokio::test]
async fn test_streak_and_habit_goals_on_libsql() {
    let (_dir, store) = create_test_store().await;
    let clock = clock_at("2024-03-13");
    let engine = GoalEngine::new(store.clone(), clock, &GoalsConfig::default());
    let today = date("2024-03-13");

    store.incr_by(&keys::score(today - Duration::days(3)), -1).await.unwrap();
    store.incr_by(&keys::score(today - Duration::days(2)), 2).await.unwrap();
    store.incr_by(&keys::score(today - Duration::days(1)), 1).await.unwrap();

    let streak = engine
        .registry()
        .create(new_goal(GoalType::Streak, "Two days", 3.0, "2024-03-01"))
        .await
        .unwrap();
    let evaluation = engine.evaluate(&streak, today).await.unwrap();
    assert_eq!(evaluation.progress.progress, 2.0);
    assert!(!evaluation.progress.is_achieved);
    assert_eq!(
        engine.registry().require(streak.id).await.unwrap().status,
        GoalStatus::Active
    );
}
