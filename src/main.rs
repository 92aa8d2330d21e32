//! Daytrack - personal daily tracker
//!
//! Command-line front end: todos, habits, notes and goals against a local
//! (or remote) libSQL database. Every todo or habit mutation re-evaluates
//! the goals it can affect and reports newly reached achievements.

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use daytrack_core::{
    dates::{format_date, parse_date},
    habits::predefined_habits,
    storage::{ConnectionMode, KvStore, LibsqlStore, MemoryStore},
    DaytrackConfig, GoalAchievement, GoalId, GoalPeriod, GoalType, GoalUpdates, HabitDefinition,
    HabitKind, NewGoal, StoreKind, SystemClock, TodoStatus, Tracker, TriggerType,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn, Level};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Get the default database path using XDG_DATA_HOME standard
fn get_default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("daytrack")
        .join("daytrack.db")
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("daytrack").join("config.toml"))
}

/// Database path from CLI arg or env var; `None` defers to the config file
fn get_db_path(cli_path: Option<String>) -> Option<String> {
    cli_path.or_else(|| {
        std::env::var("DAYTRACK_DB_PATH")
            .ok()
            .filter(|path| !path.is_empty())
    })
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<DaytrackConfig> {
    match path {
        Some(path) => DaytrackConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => match get_default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                debug!("Using config file {}", path.display());
                DaytrackConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))
            }
            None => Ok(DaytrackConfig::default()),
        },
    }
}

async fn open_store(
    db_path: Option<String>,
    config: &DaytrackConfig,
) -> anyhow::Result<Arc<dyn KvStore>> {
    if let Some(path) = get_db_path(db_path) {
        let mode = if path == ":memory:" {
            ConnectionMode::InMemory
        } else {
            ConnectionMode::Local(path)
        };
        return Ok(Arc::new(LibsqlStore::new(mode).await?));
    }

    match config.storage.backend {
        StoreKind::Memory => {
            warn!("Using the in-memory backend; nothing will be persisted");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::Libsql => {
            let default_path = get_default_db_path().to_string_lossy().to_string();
            let mode = ConnectionMode::from_config(&config.storage, &default_path)?;
            Ok(Arc::new(LibsqlStore::new(mode).await?))
        }
    }
}

fn day_or_today(date: Option<String>, tracker: &Tracker) -> anyhow::Result<NaiveDate> {
    match date {
        Some(s) => parse_date(&s).with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD)", s)),
        None => Ok(tracker.today()),
    }
}

fn parse_goal_id(s: &str) -> anyhow::Result<GoalId> {
    GoalId::from_string(s).with_context(|| format!("Invalid goal id '{}'", s))
}

fn parse_uuid(s: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("Invalid id '{}'", s))
}

fn print_achievements(achievements: &[GoalAchievement]) {
    for achievement in achievements {
        println!(
            "🏆 Goal achieved: {} ({} / {})",
            achievement.goal_snapshot.title,
            achievement.final_progress,
            achievement.goal_snapshot.target
        );
    }
}

#[derive(Parser)]
#[command(name = "daytrack")]
#[command(about = "Daily todos, habits, notes and goals", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Database path (overrides DAYTRACK_DB_PATH env var and config)
    #[arg(long)]
    db_path: Option<String>,

    /// Config file (defaults to <config dir>/daytrack/config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Check that the store is reachable and writable
    Verify,

    /// Remove expired cache entries from the database
    Purge,

    /// Todo management
    Todo {
        #[command(subcommand)]
        action: TodoAction,
    },

    /// Habit logging
    Habit {
        #[command(subcommand)]
        action: HabitAction,
    },

    /// Daily notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Goal management
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },

    /// List achievements, newest first
    Achievements,

    /// Re-evaluate goals affected by a trigger (habit, todo, score)
    Check {
        /// Date (YYYY-MM-DD)
        date: String,

        /// Trigger type
        trigger: String,
    },
}

#[derive(Subcommand)]
enum TodoAction {
    /// Add a todo
    Add {
        title: String,

        #[arg(short, long)]
        date: Option<String>,

        /// Repeat on every new day
        #[arg(long)]
        recurring: bool,
    },

    /// List a day's todos
    List {
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Flip a todo between pending and done
    Toggle {
        id: String,

        #[arg(short, long)]
        date: Option<String>,
    },

    /// Delete a todo
    Delete {
        id: String,

        #[arg(short, long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
enum HabitAction {
    /// Log a habit event
    Log {
        habit_id: String,

        #[arg(short, long)]
        date: Option<String>,

        /// Score (defaults to the habit's defined score)
        #[arg(short, long, allow_hyphen_values = true)]
        score: Option<i64>,
    },

    /// Remove a logged habit event
    Unlog {
        event_id: String,

        #[arg(short, long)]
        date: Option<String>,
    },

    /// List a day's habit events and score
    List {
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Define (or redefine) a custom habit and log it once
    Define {
        id: String,

        name: String,

        /// healthy | unhealthy
        #[arg(short, long, default_value = "healthy")]
        kind: String,

        #[arg(short, long, allow_hyphen_values = true)]
        score: i64,

        #[arg(short, long)]
        icon: Option<String>,

        #[arg(short, long)]
        date: Option<String>,
    },

    /// Show the predefined and custom habits
    Catalog,
}

#[derive(Subcommand)]
enum NoteAction {
    /// Write a day's note (replaces any previous note)
    Set {
        content: String,

        #[arg(short, long)]
        date: Option<String>,
    },

    /// Show a day's note
    Show {
        #[arg(short, long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
enum GoalAction {
    /// Create a goal
    Create {
        /// daily_score | weekly_score | streak | habit_count | todo_completion | habit_frequency
        #[arg(short = 'y', long = "type")]
        goal_type: String,

        title: String,

        #[arg(short, long)]
        target: f64,

        /// daily | weekly | monthly | custom
        #[arg(short, long, default_value = "weekly")]
        period: String,

        /// First counted day (defaults to today)
        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        /// Habit counted by habit_count goals
        #[arg(long)]
        habit: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Edit a goal
    Update {
        id: String,

        /// New goal type; leaving habit_count drops the habit
        #[arg(short = 'y', long = "type")]
        goal_type: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        target: Option<f64>,

        #[arg(short, long)]
        period: Option<String>,

        #[arg(long)]
        end: Option<String>,

        /// Habit counted by habit_count goals
        #[arg(long)]
        habit: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// List goals with their progress
    List {
        #[arg(short, long)]
        date: Option<String>,

        /// Show archived goals instead of active ones
        #[arg(long)]
        archived: bool,

        /// Show completed goals instead of active ones
        #[arg(long)]
        completed: bool,

        /// Print the overview as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one goal
    Show { id: String },

    /// Archive an active goal
    Archive { id: String },

    /// Delete a goal (its achievements are kept)
    Delete { id: String },

    /// Evaluate a goal's progress
    Progress {
        id: String,

        #[arg(short, long)]
        date: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "daytrack={level},daytrack_core={level},libsql=warn",
            level = level.as_str().to_lowercase()
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Daytrack v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.clone())?;

    if let Commands::Init = cli.command {
        let path = get_db_path(cli.db_path.clone())
            .or_else(|| config.storage.path.clone())
            .unwrap_or_else(|| get_default_db_path().to_string_lossy().to_string());
        LibsqlStore::new(ConnectionMode::Local(path.clone())).await?;
        println!("✓ Database initialized: {}", path);
        return Ok(());
    }

    if let Commands::Purge = cli.command {
        let path = get_db_path(cli.db_path.clone())
            .or_else(|| config.storage.path.clone())
            .unwrap_or_else(|| get_default_db_path().to_string_lossy().to_string());
        let store = LibsqlStore::new(ConnectionMode::Local(path)).await?;
        let removed = store.purge_expired().await?;
        println!("✓ Removed {} expired entries", removed);
        return Ok(());
    }

    let store = open_store(cli.db_path.clone(), &config).await?;
    let tracker = Tracker::new(store, Arc::new(SystemClock), &config.goals);

    match cli.command {
        Commands::Init | Commands::Purge => Ok(()),

        Commands::Verify => {
            tracker.verify().await.context("Store verification failed")?;
            println!("✓ Store is reachable and writable");
            Ok(())
        }

        Commands::Todo { action } => run_todo(&tracker, action).await,
        Commands::Habit { action } => run_habit(&tracker, action).await,
        Commands::Note { action } => run_note(&tracker, action).await,
        Commands::Goal { action } => run_goal(&tracker, action).await,

        Commands::Achievements => {
            let achievements = tracker.achievements().await?;
            if achievements.is_empty() {
                println!("No achievements yet");
            }
            for a in achievements {
                println!(
                    "{}  {}  {} ({} / {})",
                    format_date(a.achieved_date),
                    a.goal_snapshot.goal_type,
                    a.goal_snapshot.title,
                    a.final_progress,
                    a.goal_snapshot.target
                );
            }
            Ok(())
        }

        Commands::Check { date, trigger } => {
            let date = parse_date(&date)
                .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD)", date))?;
            let trigger: TriggerType = trigger.parse().map_err(|e: String| anyhow!(e))?;
            let achievements = tracker.check(date, trigger).await?;
            if achievements.is_empty() {
                println!("No new achievements");
            }
            print_achievements(&achievements);
            Ok(())
        }
    }
}

async fn run_todo(tracker: &Tracker, action: TodoAction) -> anyhow::Result<()> {
    match action {
        TodoAction::Add {
            title,
            date,
            recurring,
        } => {
            let date = day_or_today(date, tracker)?;
            let todo = tracker.add_todo(date, &title, recurring).await?;
            println!("✓ Added todo {} on {}", todo.id, format_date(date));
        }
        TodoAction::List { date } => {
            let date = day_or_today(date, tracker)?;
            let todos = tracker.todos(date).await?;
            if todos.is_empty() {
                println!("No todos on {}", format_date(date));
            }
            for todo in todos {
                let mark = if todo.status == TodoStatus::Done { "x" } else { " " };
                let recurring = if todo.is_recurring { " ↻" } else { "" };
                println!("[{}] {}{}  ({})", mark, todo.title, recurring, todo.id);
            }
        }
        TodoAction::Toggle { id, date } => {
            let date = day_or_today(date, tracker)?;
            let id = parse_uuid(&id)?;
            let current = tracker
                .todos(date)
                .await?
                .into_iter()
                .find(|t| t.id == id)
                .ok_or_else(|| anyhow!("No todo {} on {}", id, format_date(date)))?;
            let status = match current.status {
                TodoStatus::Pending => TodoStatus::Done,
                TodoStatus::Done => TodoStatus::Pending,
            };

            let achievements = tracker.toggle_todo(date, id, status).await?;
            println!("✓ {} is now {:?}", current.title, status);
            print_achievements(&achievements);
        }
        TodoAction::Delete { id, date } => {
            let date = day_or_today(date, tracker)?;
            if tracker.delete_todo(date, parse_uuid(&id)?).await? {
                println!("✓ Deleted todo {}", id);
            } else {
                println!("No todo {} on {}", id, format_date(date));
            }
        }
    }
    Ok(())
}

async fn run_habit(tracker: &Tracker, action: HabitAction) -> anyhow::Result<()> {
    match action {
        HabitAction::Log {
            habit_id,
            date,
            score,
        } => {
            let date = day_or_today(date, tracker)?;
            let logged = tracker.log_habit(date, &habit_id, score).await?;
            println!(
                "✓ Logged {} ({:+}), score for {} is {}",
                habit_id,
                logged.event.score_snapshot,
                format_date(date),
                logged.day_score
            );
            print_achievements(&logged.achievements);
        }
        HabitAction::Unlog { event_id, date } => {
            let date = day_or_today(date, tracker)?;
            match tracker
                .delete_habit_event(date, parse_uuid(&event_id)?)
                .await?
            {
                Some(unlogged) => {
                    println!(
                        "✓ Removed {} ({:+}), score for {} is {}",
                        unlogged.event.habit_id,
                        unlogged.event.score_snapshot,
                        format_date(date),
                        unlogged.day_score
                    );
                    print_achievements(&unlogged.achievements);
                }
                None => println!("No habit event {} on {}", event_id, format_date(date)),
            }
        }
        HabitAction::List { date } => {
            let date = day_or_today(date, tracker)?;
            let events = tracker.habit_events(date).await?;
            for event in &events {
                println!(
                    "{}  {:+}  {}  ({})",
                    event.timestamp.format("%H:%M"),
                    event.score_snapshot,
                    event.habit_id,
                    event.id
                );
            }
            println!("Score for {}: {}", format_date(date), tracker.daily_score(date).await?);
        }
        HabitAction::Define {
            id,
            name,
            kind,
            score,
            icon,
            date,
        } => {
            let date = day_or_today(date, tracker)?;
            let kind: HabitKind = kind.parse().map_err(|e: String| anyhow!(e))?;
            let logged = tracker
                .add_habit_definition(
                    date,
                    HabitDefinition {
                        id: id.clone(),
                        name,
                        kind,
                        score,
                        icon,
                    },
                )
                .await?;
            println!(
                "✓ Saved habit {} and logged it, score for {} is {}",
                id,
                format_date(date),
                logged.day_score
            );
            print_achievements(&logged.achievements);
        }
        HabitAction::Catalog => {
            let predefined: Vec<String> = predefined_habits().into_iter().map(|h| h.id).collect();
            for habit in tracker.habit_definitions().await? {
                let origin = if predefined.contains(&habit.id) { "" } else { " (custom)" };
                println!(
                    "{} {:<24} {:+}  {}{}",
                    habit.icon.as_deref().unwrap_or(" "),
                    habit.id,
                    habit.score,
                    habit.name,
                    origin
                );
            }
        }
    }
    Ok(())
}

async fn run_note(tracker: &Tracker, action: NoteAction) -> anyhow::Result<()> {
    match action {
        NoteAction::Set { content, date } => {
            let date = day_or_today(date, tracker)?;
            tracker.save_note(date, &content).await?;
            println!("✓ Saved note for {}", format_date(date));
        }
        NoteAction::Show { date } => {
            let date = day_or_today(date, tracker)?;
            match tracker.note(date).await? {
                Some(note) => println!("{}", note.content),
                None => println!("No note for {}", format_date(date)),
            }
        }
    }
    Ok(())
}

async fn run_goal(tracker: &Tracker, action: GoalAction) -> anyhow::Result<()> {
    match action {
        GoalAction::Create {
            goal_type,
            title,
            target,
            period,
            start,
            end,
            habit,
            description,
        } => {
            let goal_type: GoalType = goal_type.parse().map_err(|e: String| anyhow!(e))?;
            let period: GoalPeriod = period.parse().map_err(|e: String| anyhow!(e))?;
            let start_date = day_or_today(start, tracker)?;
            let end_date = end.map(|s| parse_date(&s)).transpose()?;

            let goal = tracker
                .create_goal(NewGoal {
                    goal_type,
                    title,
                    description,
                    target,
                    period,
                    start_date,
                    end_date,
                    habit_id: habit,
                })
                .await?;
            println!("✓ Created goal {} ({})", goal.id, goal.title);
        }
        GoalAction::Update {
            id,
            goal_type,
            title,
            target,
            period,
            end,
            habit,
            description,
        } => {
            let goal_type = goal_type
                .map(|t| t.parse::<GoalType>().map_err(|e| anyhow!(e)))
                .transpose()?;
            let period = period
                .map(|p| p.parse::<GoalPeriod>().map_err(|e| anyhow!(e)))
                .transpose()?;
            let end_date = end.map(|s| parse_date(&s)).transpose()?;
            let goal = tracker
                .update_goal(
                    parse_goal_id(&id)?,
                    GoalUpdates {
                        goal_type,
                        title,
                        target,
                        period,
                        end_date,
                        habit_id: habit,
                        description,
                        ..Default::default()
                    },
                )
                .await?;
            println!("✓ Updated goal {} ({})", goal.id, goal.title);
        }
        GoalAction::List {
            date,
            archived,
            completed,
            json,
        } => {
            if archived || completed {
                let goals = if archived {
                    tracker.archived_goals().await?
                } else {
                    tracker.completed_goals().await?
                };
                if json {
                    println!("{}", serde_json::to_string_pretty(&goals)?);
                    return Ok(());
                }
                for goal in goals {
                    println!("{}  {}  {}  target {}", goal.id, goal.goal_type, goal.title, goal.target);
                }
                return Ok(());
            }

            let date = day_or_today(date, tracker)?;
            let overview = tracker.goals_overview(date).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
                return Ok(());
            }
            if overview.goals.is_empty() {
                println!("No active goals");
            }
            for goal in &overview.goals {
                let progress = overview.progress.get(&goal.id).copied().unwrap_or(0.0);
                println!(
                    "{}  {:<16} {}  {} / {}",
                    goal.id, goal.goal_type, goal.title, progress, goal.target
                );
            }
        }
        GoalAction::Show { id } => {
            let id = parse_goal_id(&id)?;
            let goal = tracker.goal(id).await?;
            println!("{}", serde_json::to_string_pretty(&goal)?);
            for achievement in tracker.goal_achievements(id).await? {
                println!(
                    "🏆 {} with {} (recorded {})",
                    format_date(achievement.achieved_date),
                    achievement.final_progress,
                    achievement.achieved_at.to_rfc3339()
                );
            }
        }
        GoalAction::Archive { id } => {
            let goal = tracker.archive_goal(parse_goal_id(&id)?).await?;
            println!("✓ Archived goal {} ({})", goal.id, goal.title);
        }
        GoalAction::Delete { id } => {
            if tracker.delete_goal(parse_goal_id(&id)?).await? {
                println!("✓ Deleted goal {}", id);
            } else {
                println!("No goal {}", id);
            }
        }
        GoalAction::Progress { id, date } => {
            let date = day_or_today(date, tracker)?;
            let evaluation = tracker.goal_progress(parse_goal_id(&id)?, date).await?;
            let progress = &evaluation.progress;
            println!(
                "{} on {}: {}{}",
                progress.goal_id,
                format_date(progress.date),
                progress.progress,
                if progress.is_achieved { " (achieved)" } else { "" }
            );
            if let Some(achievement) = evaluation.achievement {
                print_achievements(&[achievement]);
            }
        }
    }
    Ok(())
}
