//! Multi-day tracker workflows
//!
//! Drives the tracker the way the CLI does: log habits and toggle todos day
//! by day and check which goals complete, and when.

mod common;

use chrono::Duration;
use common::{clock_at, date, memory_tracker, new_goal};
use daytrack_core::{
    GoalStatus, GoalType, GoalUpdates, HabitDefinition, HabitKind, TodoStatus, TriggerType,
};

#[tokio::test]
async fn test_streak_goal_completes_on_third_day() {
    let clock = clock_at("2024-03-04");
    let tracker = memory_tracker(clock.clone());
    let goal = tracker
        .create_goal(new_goal(GoalType::Streak, "Three good days", 3.0, "2024-03-04"))
        .await
        .unwrap();

    for (i, day) in ["2024-03-04", "2024-03-05", "2024-03-06"].iter().enumerate() {
        let day = date(day);
        let logged = tracker.log_habit(day, "habit_leer", None).await.unwrap();
        if i < 2 {
            assert!(logged.achievements.is_empty(), "day {} too early", day);
        } else {
            assert_eq!(logged.achievements.len(), 1);
            assert_eq!(logged.achievements[0].final_progress, 3.0);
            assert_eq!(logged.achievements[0].achieved_date, day);
        }
        clock.advance(Duration::days(1));
    }

    assert_eq!(
        tracker.goal(goal.id).await.unwrap().status,
        GoalStatus::Completed
    );
}

#[tokio::test]
async fn test_unhealthy_day_breaks_streak() {
    let clock = clock_at("2024-03-04");
    let tracker = memory_tracker(clock.clone());
    let goal = tracker
        .create_goal(new_goal(GoalType::Streak, "Week", 7.0, "2024-03-04"))
        .await
        .unwrap();

    tracker.log_habit(date("2024-03-04"), "habit_leer", None).await.unwrap();
    tracker.log_habit(date("2024-03-05"), "habit_alcohol", None).await.unwrap();
    tracker.log_habit(date("2024-03-06"), "habit_yoga", None).await.unwrap();

    let evaluation = tracker.goal_progress(goal.id, date("2024-03-07")).await.unwrap();
    // 03-07 is unlogged (skipped), 03-06 counts, 03-05 is negative
    assert_eq!(evaluation.progress.progress, 1.0);
}

#[tokio::test]
async fn test_custom_definition_changes_healthy_count() {
    let clock = clock_at("2024-03-05");
    let tracker = memory_tracker(clock.clone());
    let goal = tracker
        .create_goal(new_goal(GoalType::HabitFrequency, "Healthy habits", 10.0, "2024-03-01"))
        .await
        .unwrap();
    let day = date("2024-03-05");

    tracker.log_habit(day, "habit_coding", None).await.unwrap();
    tracker.log_habit(day, "habit_redes_sociales", None).await.unwrap();
    assert_eq!(
        tracker.goal_progress(goal.id, day).await.unwrap().progress.progress,
        1.0
    );

    // Redefining a catalog habit as healthy makes its past events count too
    tracker
        .add_habit_definition(
            day,
            HabitDefinition {
                id: "habit_redes_sociales".to_string(),
                name: "Redes (trabajo)".to_string(),
                kind: HabitKind::Healthy,
                score: 1,
                icon: None,
            },
        )
        .await
        .unwrap();

    clock.advance(Duration::hours(2));
    assert_eq!(
        tracker.goal_progress(goal.id, day).await.unwrap().progress.progress,
        3.0
    );
}

#[tokio::test]
async fn test_todo_goal_ignores_habit_triggers() {
    let clock = clock_at("2024-03-05");
    let tracker = memory_tracker(clock.clone());
    let day = date("2024-03-05");
    tracker
        .create_goal(new_goal(GoalType::TodoCompletion, "Finish everything", 100.0, "2024-03-05"))
        .await
        .unwrap();

    let todo = tracker.add_todo(day, "file taxes", false).await.unwrap();
    // Status changed behind the tracker's back; only a todo trigger notices
    tracker
        .engine()
        .aggregates()
        .set_todo_status(day, todo.id, TodoStatus::Done)
        .await
        .unwrap();

    let logged = tracker.log_habit(day, "habit_agua", None).await.unwrap();
    assert!(logged.achievements.is_empty());

    let achieved = tracker.check(day, TriggerType::Todo).await.unwrap();
    assert_eq!(achieved.len(), 1);
    assert_eq!(achieved[0].final_progress, 100.0);
}

#[tokio::test]
async fn test_edit_then_complete_snapshot_reflects_edit() {
    let clock = clock_at("2024-03-05");
    let tracker = memory_tracker(clock.clone());
    let day = date("2024-03-05");
    let goal = tracker
        .create_goal(new_goal(GoalType::DailyScore, "Score 10", 10.0, "2024-03-01"))
        .await
        .unwrap();

    tracker
        .update_goal(
            goal.id,
            GoalUpdates {
                title: Some("Score 4".to_string()),
                target: Some(4.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let logged = tracker.log_habit(day, "habit_entrenamiento", None).await.unwrap();
    assert_eq!(logged.achievements.len(), 1);
    let snapshot = &logged.achievements[0].goal_snapshot;
    assert_eq!(snapshot.title, "Score 4");
    assert_eq!(snapshot.target, 4.0);

    // Later edits do not touch the recorded snapshot
    tracker
        .update_goal(
            goal.id,
            GoalUpdates {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let history = tracker.achievements().await.unwrap();
    assert_eq!(history[0].goal_snapshot.title, "Score 4");
}

#[tokio::test]
async fn test_archived_goal_is_never_evaluated() {
    let clock = clock_at("2024-03-05");
    let tracker = memory_tracker(clock.clone());
    let day = date("2024-03-05");
    let goal = tracker
        .create_goal(new_goal(GoalType::DailyScore, "Score 1", 1.0, "2024-03-01"))
        .await
        .unwrap();
    tracker.archive_goal(goal.id).await.unwrap();

    let logged = tracker.log_habit(day, "habit_entrenamiento", None).await.unwrap();
    assert!(logged.achievements.is_empty());
    assert!(tracker.achievements().await.unwrap().is_empty());
    assert_eq!(
        tracker.goal(goal.id).await.unwrap().status,
        GoalStatus::Archived
    );
}
