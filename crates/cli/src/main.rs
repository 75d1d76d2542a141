//! Cadence CLI - habits, tasks and goals from the terminal.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cadence_core::{
    format_date, parse_date, Difficulty, Frequency, Goal, GoalId, GoalUpdate, Habit, HabitId, HabitState,
    HabitUpdate, MilestoneId, Task, TaskId, TaskKind, TaskUpdate, TrackingType,
};
use cadence_progress::{
    filter_by_category, sort_habits, sort_tasks_by_completion, EngineConfig, HabitSort, LogOutcome,
    ProgressTracker, Window,
};
use cadence_storage::{JsonStorage, Storage};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Track habits, tasks and goals", long_about = None)]
struct Cli {
    /// Data directory
    #[arg(long, global = true, default_value = ".cadence")]
    data_dir: PathBuf,

    /// Config file [default: <data-dir>/config.json]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage habits
    Habit {
        #[command(subcommand)]
        command: HabitCommand,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Manage goals
    Goal {
        #[command(subcommand)]
        command: GoalCommand,
    },
    /// Show what is due on a day
    Due {
        /// Day to show [default: today]
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Show statistics for a trailing window
    Stats {
        /// Window length: 7, 30 or 90 days
        #[arg(long, default_value = "7")]
        window: Window,
        /// Last day of the window [default: today]
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum HabitCommand {
    /// Add a habit
    Add {
        /// Habit name
        name: String,
        /// Category key
        #[arg(long, default_value = "general")]
        category: String,
        /// easy, medium or hard
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
        /// daily, weekly, weekdays or monthdays
        #[arg(long, default_value = "daily")]
        frequency: String,
        /// Day set for the frequency (weekdays 0-6 from Sunday, or month days 1-31)
        #[arg(long, value_delimiter = ',')]
        days: Vec<u8>,
        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List habits
    List {
        /// Include archived habits
        #[arg(long)]
        all: bool,
        /// Only this category
        #[arg(long)]
        category: Option<String>,
        /// created, streak, difficulty or difficulty-desc
        #[arg(long, default_value = "created")]
        sort: HabitSort,
    },
    /// Change a habit's fields
    Edit(HabitEdit),
    /// Log a day: done, skipped or missed
    Log {
        /// Habit ID
        id: HabitId,
        /// New state
        state: HabitState,
        /// Day to log [default: today]
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Archive a habit
    Archive {
        /// Habit ID
        id: HabitId,
    },
    /// Restore an archived habit
    Restore {
        /// Habit ID
        id: HabitId,
    },
    /// Check the stored streak against the log history
    Verify {
        /// Habit ID
        id: HabitId,
        /// Day to check up to [default: today]
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add a task
    Add {
        /// Task title
        title: String,
        /// daily, one-time or monthly
        #[arg(long, default_value = "one-time")]
        kind: TaskKind,
        /// Days of the month for monthly tasks
        #[arg(long, value_delimiter = ',')]
        days: Vec<u8>,
        /// Explicit dates for monthly tasks
        #[arg(long = "on", value_delimiter = ',', value_parser = parse_date)]
        dates: Vec<NaiveDate>,
        /// Category key
        #[arg(long)]
        category: Option<String>,
        /// Goal to feed
        #[arg(long)]
        goal: Option<GoalId>,
    },
    /// List tasks
    List {
        /// Only this category
        #[arg(long)]
        category: Option<String>,
        /// Show open tasks before completed ones
        #[arg(long)]
        open_first: bool,
    },
    /// Change a task's fields
    Edit(TaskEdit),
    /// Complete a one-time task, or toggle a recurring task for a day
    Complete {
        /// Task ID
        id: TaskId,
        /// Day [default: today]
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Delete a task and drop it from its goal
    Delete {
        /// Task ID
        id: TaskId,
    },
}

#[derive(Subcommand)]
enum GoalCommand {
    /// Add a goal
    Add {
        /// Goal title
        title: String,
        /// Day to reach the goal by
        #[arg(long, value_parser = parse_date)]
        target_date: NaiveDate,
        /// percentage, numeric or checklist
        #[arg(long, default_value = "percentage")]
        tracking: TrackingType,
        /// Target for numeric goals
        #[arg(long)]
        target: Option<f64>,
        /// Why the goal matters
        #[arg(long)]
        why: Option<String>,
        /// Category key
        #[arg(long)]
        category: Option<String>,
        /// Derive progress from linked habits and tasks
        #[arg(long)]
        auto: bool,
    },
    /// List goals, most urgent first
    List {
        /// Only this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Change a goal's fields
    Edit(GoalEdit),
    /// Mark a goal complete
    Complete {
        /// Goal ID
        id: GoalId,
    },
    /// Reopen a completed goal
    Reopen {
        /// Goal ID
        id: GoalId,
    },
    /// Turn auto-tracking from linked habits and tasks on or off
    Auto {
        /// Goal ID
        id: GoalId,
        /// on or off
        #[arg(value_enum)]
        switch: Switch,
    },
    /// Delete a goal and clear its links
    Delete {
        /// Goal ID
        id: GoalId,
    },
    /// Set manual progress
    Progress {
        /// Goal ID
        id: GoalId,
        /// New value in the goal's unit
        value: f64,
    },
    /// Manage checklist milestones
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommand,
    },
    /// Link a habit or task to a goal
    Link {
        /// Goal ID
        id: GoalId,
        /// Habit to link
        #[arg(long)]
        habit: Option<HabitId>,
        /// Task to link
        #[arg(long)]
        task: Option<TaskId>,
        /// Remove the link instead
        #[arg(long)]
        unlink: bool,
    },
    /// Show progress and deadline status
    Status {
        /// Goal ID
        id: GoalId,
    },
    /// Recalculate auto-tracked progress
    Recalc {
        /// Goal ID
        id: GoalId,
    },
}

#[derive(Subcommand)]
enum MilestoneCommand {
    /// Add a milestone
    Add {
        /// Goal ID
        goal: GoalId,
        /// Milestone title
        title: String,
    },
    /// Tick a milestone
    Check {
        /// Goal ID
        goal: GoalId,
        /// Milestone ID
        milestone: MilestoneId,
        /// Untick instead
        #[arg(long)]
        undo: bool,
    },
    /// Remove a milestone
    Remove {
        /// Goal ID
        goal: GoalId,
        /// Milestone ID
        milestone: MilestoneId,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Switch {
    /// Enable
    On,
    /// Disable
    Off,
}

#[derive(Args)]
struct HabitEdit {
    /// Habit ID
    id: HabitId,
    /// New name
    #[arg(long)]
    name: Option<String>,
    /// New category key
    #[arg(long)]
    category: Option<String>,
    /// easy, medium or hard
    #[arg(long)]
    difficulty: Option<Difficulty>,
    /// daily, weekly, weekdays or monthdays
    #[arg(long)]
    frequency: Option<String>,
    /// Day set for the new frequency
    #[arg(long, value_delimiter = ',', requires = "frequency")]
    days: Vec<u8>,
    /// New notes
    #[arg(long)]
    notes: Option<String>,
    /// Remove the notes
    #[arg(long, conflicts_with = "notes")]
    clear_notes: bool,
}

impl HabitEdit {
    fn updates(self) -> Result<Vec<HabitUpdate>> {
        let mut updates = Vec::new();
        if let Some(name) = self.name {
            updates.push(HabitUpdate::Name(name));
        }
        if let Some(category) = self.category {
            updates.push(HabitUpdate::Category(category));
        }
        if let Some(difficulty) = self.difficulty {
            updates.push(HabitUpdate::Difficulty(difficulty));
        }
        if let Some(kind) = self.frequency {
            updates.push(HabitUpdate::Frequency(parse_frequency(&kind, self.days)?));
        }
        if self.notes.is_some() || self.clear_notes {
            updates.push(HabitUpdate::Notes(self.notes));
        }
        Ok(updates)
    }
}

#[derive(Args)]
struct TaskEdit {
    /// Task ID
    id: TaskId,
    /// New title
    #[arg(long)]
    title: Option<String>,
    /// daily, one-time or monthly
    #[arg(long)]
    kind: Option<TaskKind>,
    /// Days of the month for monthly tasks
    #[arg(long, value_delimiter = ',')]
    days: Option<Vec<u8>>,
    /// Explicit dates for monthly tasks
    #[arg(long = "on", value_delimiter = ',', value_parser = parse_date)]
    dates: Option<Vec<NaiveDate>>,
    /// New category key
    #[arg(long)]
    category: Option<String>,
}

impl TaskEdit {
    fn updates(self) -> Vec<TaskUpdate> {
        let mut updates = Vec::new();
        if let Some(title) = self.title {
            updates.push(TaskUpdate::Title(title));
        }
        if let Some(kind) = self.kind {
            updates.push(TaskUpdate::Kind(kind));
        }
        if let Some(days) = self.days {
            updates.push(TaskUpdate::MonthDays(days.into_iter().collect()));
        }
        if let Some(dates) = self.dates {
            updates.push(TaskUpdate::Dates(dates.into_iter().collect()));
        }
        if let Some(category) = self.category {
            updates.push(TaskUpdate::Category(Some(category)));
        }
        updates
    }
}

#[derive(Args)]
struct GoalEdit {
    /// Goal ID
    id: GoalId,
    /// New title
    #[arg(long)]
    title: Option<String>,
    /// Why the goal matters
    #[arg(long)]
    why: Option<String>,
    /// New target date
    #[arg(long, value_parser = parse_date)]
    target_date: Option<NaiveDate>,
    /// percentage, numeric or checklist
    #[arg(long)]
    tracking: Option<TrackingType>,
    /// Target for numeric goals
    #[arg(long)]
    target: Option<f64>,
    /// New category key
    #[arg(long)]
    category: Option<String>,
}

impl GoalEdit {
    fn updates(self) -> Vec<GoalUpdate> {
        let mut updates = Vec::new();
        if let Some(title) = self.title {
            updates.push(GoalUpdate::Title(title));
        }
        if let Some(why) = self.why {
            updates.push(GoalUpdate::Why(Some(why)));
        }
        if let Some(date) = self.target_date {
            updates.push(GoalUpdate::TargetDate(date));
        }
        match (self.tracking, self.target) {
            (Some(tracking_type), target_value) => updates.push(GoalUpdate::Tracking { tracking_type, target_value }),
            (None, Some(value)) => updates.push(GoalUpdate::TargetValue(value)),
            (None, None) => {}
        }
        if let Some(category) = self.category {
            updates.push(GoalUpdate::Category(Some(category)));
        }
        updates
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli.data_dir, cli.config.as_deref()).await?;
    let storage = JsonStorage::new(&cli.data_dir).await?;
    let tracker = ProgressTracker::with_config(storage, config);
    let json = cli.json;

    match cli.command {
        Commands::Habit { command } => habit(tracker, command, json).await,
        Commands::Task { command } => task(tracker, command, json).await,
        Commands::Goal { command } => goal(tracker, command, json).await,
        Commands::Due { date } => {
            let date = date.unwrap_or_else(|| tracker.today());
            let due = tracker.due_on(date).await?;
            if json {
                return print_json(&due);
            }

            println!("Due on {}", format_date(due.date));
            println!("Habits ({})", due.habits.len());
            for item in &due.habits {
                println!(
                    "  {} | {:<7} | {} ({})",
                    item.habit.id,
                    item.state,
                    item.habit.name,
                    item.habit.frequency.label()
                );
            }
            println!("Tasks ({})", due.tasks.len());
            for item in &due.tasks {
                let mark = if item.completed { "x" } else { " " };
                println!("  {} | [{}] {} ({})", item.task.id, mark, item.task.title, item.task.kind.label());
            }
            Ok(())
        }
        Commands::Stats { window, date } => {
            let tracker = match date {
                Some(date) => tracker.with_today(date),
                None => tracker,
            };
            let report = tracker.analytics(window).await?;
            let overview = tracker.overview().await?;
            if json {
                let streaks = tracker.streak_history(Window::Month).await?;
                let tasks = tracker.task_trend(window).await?;
                return print_json(&serde_json::json!({
                    "overview": overview,
                    "report": report,
                    "streak_history": streaks,
                    "task_trend": tasks,
                }));
            }

            println!(
                "Last {} days ({} to {})",
                report.window_days,
                format_date(report.start),
                format_date(report.end)
            );
            println!("  Completion: {}%", report.completion_rate);
            println!("  Consistency: {}%", report.consistency_score);
            println!(
                "  Done {} | Skipped {} | Missed {}",
                report.totals.done, report.totals.skipped, report.totals.missed
            );
            println!(
                "Habits: {} active of {} | streaks {} | best {}",
                overview.active_habits, overview.total_habits, overview.total_current_streak, overview.best_streak
            );
            println!(
                "Goals: {} active, {} completed, {}% average",
                overview.active_goals, overview.completed_goals, overview.average_goal_progress
            );
            println!(
                "Tasks today: {} due, {} completed",
                overview.tasks_due_today, overview.tasks_completed_today
            );
            for stats in &report.habits {
                let week: String = stats
                    .last_7_days
                    .iter()
                    .map(|d| match d.state {
                        Some(HabitState::Done) => '#',
                        Some(HabitState::Skipped) => '~',
                        Some(HabitState::Missed) => 'x',
                        _ => '.',
                    })
                    .collect();
                println!(
                    "  {} [{}] {}% | consistency {}% | streak {} (best {})",
                    stats.name,
                    week,
                    stats.completion_rate,
                    stats.consistency_score,
                    stats.current_streak,
                    stats.best_streak
                );
            }
            Ok(())
        }
    }
}

async fn habit(mut tracker: ProgressTracker<JsonStorage>, command: HabitCommand, json: bool) -> Result<()> {
    match command {
        HabitCommand::Add { name, category, difficulty, frequency, days, notes } => {
            let mut habit = Habit::new(name, category, difficulty, parse_frequency(&frequency, days)?);
            habit.notes = notes;
            let habit = tracker.add_habit(habit).await?;
            println!("Added habit: {} - {}", habit.id, habit.name);
        }
        HabitCommand::List { all, category, sort } => {
            let habits: Vec<Habit> = tracker
                .storage()
                .list_habits()
                .await?
                .into_iter()
                .filter(|h| all || !h.archived)
                .collect();
            let mut habits = filter_by_category(habits, category.as_deref());
            sort_habits(&mut habits, sort);
            if json {
                return print_json(&habits);
            }

            println!("Habits ({})", habits.len());
            for h in habits {
                println!(
                    "  {} | {} | {} | streak {} (best {}){}",
                    h.id,
                    h.name,
                    h.frequency.label(),
                    h.current_streak,
                    h.best_streak,
                    if h.archived { " | archived" } else { "" }
                );
            }
        }
        HabitCommand::Edit(edit) => {
            let id = edit.id;
            let updates = edit.updates()?;
            if updates.is_empty() {
                bail!("nothing to change");
            }
            let mut habit = None;
            for update in updates {
                habit = Some(tracker.update_habit(id, update).await?);
            }
            if let Some(habit) = habit {
                println!("Updated habit: {} ({})", habit.name, habit.frequency.label());
            }
        }
        HabitCommand::Log { id, state, date } => {
            let date = date.unwrap_or_else(|| tracker.today());
            match tracker.log_habit(id, date, state).await? {
                LogOutcome::AlreadyCompleted => {
                    println!("Already done on {}", format_date(date));
                }
                LogOutcome::Recorded(day) => {
                    println!(
                        "Logged {} on {} | streak {} (best {})",
                        state,
                        format_date(date),
                        day.after.current,
                        day.after.best
                    );
                }
            }
        }
        HabitCommand::Archive { id } => {
            let habit = tracker.update_habit(id, HabitUpdate::Archived(true)).await?;
            println!("Archived habit: {}", habit.name);
        }
        HabitCommand::Restore { id } => {
            let habit = tracker.update_habit(id, HabitUpdate::Archived(false)).await?;
            println!("Restored habit: {}", habit.name);
        }
        HabitCommand::Verify { id, date } => {
            let date = date.unwrap_or_else(|| tracker.today());
            let check = tracker.verify_streak(id, date).await?;
            if json {
                return print_json(&check);
            }
            if check.is_consistent() {
                println!("Streak {} matches the log history", check.stored);
            } else {
                println!("Stored streak {} but logs show {}", check.stored, check.observed);
            }
        }
    }
    Ok(())
}

async fn task(mut tracker: ProgressTracker<JsonStorage>, command: TaskCommand, json: bool) -> Result<()> {
    match command {
        TaskCommand::Add { title, kind, days, dates, category, goal } => {
            let mut task = Task::new(title, kind);
            task.month_days = days.into_iter().collect();
            task.dates = dates.into_iter().collect();
            task.category = category;
            task.linked_goal_id = goal;
            let task = tracker.add_task(task).await?;
            println!("Added task: {} - {}", task.id, task.title);
        }
        TaskCommand::List { category, open_first } => {
            let today = tracker.today();
            let mut tasks = filter_by_category(tracker.storage().list_tasks().await?, category.as_deref());
            if open_first {
                sort_tasks_by_completion(&mut tasks, today);
            }
            if json {
                return print_json(&tasks);
            }

            println!("Tasks ({})", tasks.len());
            for t in tasks {
                let mark = if t.is_completed_on(today) { "x" } else { " " };
                println!("  {} | [{}] {} ({})", t.id, mark, t.title, t.kind.label());
            }
        }
        TaskCommand::Complete { id, date } => {
            let date = date.unwrap_or_else(|| tracker.today());
            let done = tracker.complete_task(id, date).await?;
            let verb = if done { "Completed" } else { "Reopened" };
            println!("{} task {} for {}", verb, id, format_date(date));
        }
        TaskCommand::Edit(edit) => {
            let id = edit.id;
            let updates = edit.updates();
            if updates.is_empty() {
                bail!("nothing to change");
            }
            let mut task = None;
            for update in updates {
                task = Some(tracker.update_task(id, update).await?);
            }
            if let Some(task) = task {
                println!("Updated task: {} ({})", task.title, task.kind.label());
            }
        }
        TaskCommand::Delete { id } => {
            let task = tracker.delete_task(id).await?;
            println!("Deleted task: {}", task.title);
        }
    }
    Ok(())
}

async fn goal(mut tracker: ProgressTracker<JsonStorage>, command: GoalCommand, json: bool) -> Result<()> {
    match command {
        GoalCommand::Add { title, target_date, tracking, target, why, category, auto } => {
            let mut goal = Goal::new(title, target_date, tracking);
            goal.target_value = target;
            goal.why = why;
            goal.category = category;
            goal.auto_track = auto;
            let goal = tracker.add_goal(goal).await?;
            println!("Added goal: {} - {}", goal.id, goal.title);
        }
        GoalCommand::List { category } => {
            let mut summaries = tracker.goal_summaries().await?;
            if category.is_some() {
                let kept: Vec<GoalId> = filter_by_category(tracker.storage().list_goals().await?, category.as_deref())
                    .into_iter()
                    .map(|g| g.id)
                    .collect();
                summaries.retain(|s| kept.contains(&s.goal_id));
            }
            if json {
                return print_json(&summaries);
            }

            println!("Goals ({})", summaries.len());
            for s in summaries {
                println!(
                    "  {} | {:>3.0}% | {:<9} | {} days | {}",
                    s.goal_id, s.progress, s.status, s.days_remaining, s.title
                );
            }
        }
        GoalCommand::Edit(edit) => {
            let id = edit.id;
            let updates = edit.updates();
            if updates.is_empty() {
                bail!("nothing to change");
            }
            let mut goal = None;
            for update in updates {
                goal = Some(tracker.update_goal(id, update).await?);
            }
            if let Some(goal) = goal {
                println!("Updated goal: {} (due {})", goal.title, format_date(goal.target_date));
            }
        }
        GoalCommand::Complete { id } => {
            let goal = tracker.update_goal(id, GoalUpdate::Completed(true)).await?;
            println!("Completed goal: {}", goal.title);
        }
        GoalCommand::Reopen { id } => {
            let goal = tracker.update_goal(id, GoalUpdate::Completed(false)).await?;
            println!("Reopened goal: {}", goal.title);
        }
        GoalCommand::Auto { id, switch } => {
            let enabled = switch == Switch::On;
            let goal = tracker.update_goal(id, GoalUpdate::AutoTrack(enabled)).await?;
            let report = tracker.goal_progress(id).await?;
            let state = if enabled { "on" } else { "off" };
            println!("Auto-tracking {} for {} ({:.0}%)", state, goal.title, report.percentage);
        }
        GoalCommand::Delete { id } => {
            let goal = tracker.delete_goal(id).await?;
            println!("Deleted goal: {}", goal.title);
        }
        GoalCommand::Progress { id, value } => {
            let goal = tracker.set_progress(id, value).await?;
            let report = tracker.goal_progress(goal.id).await?;
            println!("{}: {} ({:.0}%)", goal.title, report.label, report.percentage);
        }
        GoalCommand::Milestone { command } => {
            let (id, update) = match command {
                MilestoneCommand::Add { goal, title } => (goal, GoalUpdate::AddMilestone(title)),
                MilestoneCommand::Check { goal, milestone, undo } => (
                    goal,
                    GoalUpdate::SetMilestone {
                        id: milestone,
                        completed: !undo,
                    },
                ),
                MilestoneCommand::Remove { goal, milestone } => (goal, GoalUpdate::RemoveMilestone(milestone)),
            };
            let goal = tracker.update_goal(id, update).await?;
            for m in &goal.milestones {
                println!("  {} [{}] {}", m.id, if m.completed { "x" } else { " " }, m.title);
            }
        }
        GoalCommand::Link { id, habit, task, unlink } => {
            if habit.is_none() && task.is_none() {
                bail!("pass --habit or --task");
            }
            if let Some(habit) = habit {
                if unlink {
                    tracker.unlink_habit(id, habit).await?;
                } else {
                    tracker.link_habit(id, habit).await?;
                }
            }
            if let Some(task) = task {
                if unlink {
                    tracker.unlink_task(id, task).await?;
                } else {
                    tracker.link_task(id, task).await?;
                }
            }
            let report = tracker.goal_progress(id).await?;
            println!("Goal {} now at {:.0}%", id, report.percentage);
        }
        GoalCommand::Status { id } => {
            let report = tracker.goal_progress(id).await?;
            let status = tracker.time_status(id).await?;
            if json {
                return print_json(&serde_json::json!({ "progress": report, "time": status }));
            }

            println!("Progress: {} ({:.0}%)", report.label, report.percentage);
            println!("Status: {}", status.status);
            println!("Days remaining: {}", status.days_remaining);
            println!("Time elapsed: {:.0}%", status.time_progress);
            println!("Behind schedule: {}", status.is_behind_schedule);
        }
        GoalCommand::Recalc { id } => match tracker.recalculate_goal(id).await? {
            Some(value) => println!("Progress updated to {}", value),
            None => println!("Progress unchanged"),
        },
    }
    Ok(())
}

/// Build a frequency rule from its CLI name and day set.
fn parse_frequency(kind: &str, days: Vec<u8>) -> Result<Frequency> {
    let days = days.into_iter().collect();
    let rule = match kind.to_lowercase().as_str() {
        "daily" => Frequency::Daily,
        "weekly" => Frequency::Weekly { days },
        "weekdays" | "specific-weekdays" => Frequency::SpecificWeekdays { days },
        "monthdays" | "specific-month-days" | "monthly" => Frequency::SpecificMonthDays { days },
        other => bail!("unknown frequency '{}'", other),
    };
    rule.validate()?;
    Ok(rule)
}

async fn load_config(data_dir: &Path, explicit: Option<&Path>) -> Result<EngineConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join("config.json"));

    match tokio::fs::read_to_string(&path).await {
        Ok(json) => {
            debug!(path = %path.display(), "loaded config");
            EngineConfig::from_json(&json).with_context(|| format!("invalid config {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => Ok(EngineConfig::default()),
        Err(e) => Err(e).with_context(|| format!("cannot read config {}", path.display())),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frequency() {
        assert_eq!(parse_frequency("daily", vec![]).unwrap(), Frequency::Daily);
        assert_eq!(
            parse_frequency("weekdays", vec![1, 3]).unwrap(),
            Frequency::SpecificWeekdays { days: [1, 3].into_iter().collect() }
        );
        assert!(parse_frequency("weekdays", vec![7]).is_err());
        assert!(parse_frequency("fortnightly", vec![]).is_err());
    }

    #[test]
    fn test_cli_parses_log() {
        let id = HabitId::new();
        let id_arg = id.to_string();
        let cli = Cli::try_parse_from([
            "cadence",
            "habit",
            "log",
            id_arg.as_str(),
            "done",
            "--date",
            "2024-07-15",
        ])
        .unwrap();
        let Commands::Habit { command: HabitCommand::Log { id: parsed, state, date } } = cli.command else {
            panic!("expected habit log");
        };
        assert_eq!(parsed, id);
        assert_eq!(state, HabitState::Done);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 7, 15));
    }

    #[test]
    fn test_habit_edit_builds_updates() {
        let id_arg = HabitId::new().to_string();
        let cli = Cli::try_parse_from([
            "cadence",
            "habit",
            "edit",
            id_arg.as_str(),
            "--name",
            "Row",
            "--frequency",
            "weekdays",
            "--days",
            "1,3",
            "--clear-notes",
        ])
        .unwrap();
        let Commands::Habit { command: HabitCommand::Edit(edit) } = cli.command else {
            panic!("expected habit edit");
        };
        assert_eq!(
            edit.updates().unwrap(),
            vec![
                HabitUpdate::Name("Row".into()),
                HabitUpdate::Frequency(Frequency::SpecificWeekdays { days: [1, 3].into_iter().collect() }),
                HabitUpdate::Notes(None),
            ]
        );

        let days_alone = ["cadence", "habit", "edit", id_arg.as_str(), "--days", "1"];
        assert!(Cli::try_parse_from(days_alone).is_err());
    }

    #[test]
    fn test_goal_edit_and_auto() {
        let id_arg = GoalId::new().to_string();
        let target_only = Cli::try_parse_from(["cadence", "goal", "edit", id_arg.as_str(), "--target", "12"]).unwrap();
        let Commands::Goal { command: GoalCommand::Edit(edit) } = target_only.command else {
            panic!("expected goal edit");
        };
        assert_eq!(edit.updates(), vec![GoalUpdate::TargetValue(12.0)]);

        let switch = Cli::try_parse_from([
            "cadence",
            "goal",
            "edit",
            id_arg.as_str(),
            "--tracking",
            "numeric",
            "--target",
            "12",
        ])
        .unwrap();
        let Commands::Goal { command: GoalCommand::Edit(edit) } = switch.command else {
            panic!("expected goal edit");
        };
        assert_eq!(
            edit.updates(),
            vec![GoalUpdate::Tracking { tracking_type: TrackingType::Numeric, target_value: Some(12.0) }]
        );

        let auto = Cli::try_parse_from(["cadence", "goal", "auto", id_arg.as_str(), "off"]).unwrap();
        let Commands::Goal { command: GoalCommand::Auto { switch, .. } } = auto.command else {
            panic!("expected goal auto");
        };
        assert_eq!(switch, Switch::Off);
    }

    #[test]
    fn test_task_edit_kind() {
        let id_arg = TaskId::new().to_string();
        let cli = Cli::try_parse_from(["cadence", "task", "edit", id_arg.as_str(), "--kind", "daily"]).unwrap();
        let Commands::Task { command: TaskCommand::Edit(edit) } = cli.command else {
            panic!("expected task edit");
        };
        assert_eq!(edit.updates(), vec![TaskUpdate::Kind(TaskKind::Daily)]);
    }

    #[test]
    fn test_list_filters_parse() {
        let cli = Cli::try_parse_from(["cadence", "habit", "list", "--category", "health", "--sort", "streak"]).unwrap();
        let Commands::Habit { command: HabitCommand::List { category, sort, all } } = cli.command else {
            panic!("expected habit list");
        };
        assert_eq!((category.as_deref(), sort, all), (Some("health"), HabitSort::Streak, false));
        assert!(Cli::try_parse_from(["cadence", "habit", "list", "--sort", "name"]).is_err());
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        assert!(Cli::try_parse_from(["cadence", "due", "--date", "2024-7-15"]).is_err());
    }

    #[tokio::test]
    async fn test_missing_default_config_falls_back() {
        let dir = std::env::temp_dir().join(format!("cadence-cli-{}", HabitId::new()));
        let config = load_config(&dir, None).await.unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(load_config(&dir, Some(&dir.join("nope.json"))).await.is_err());
    }
}
