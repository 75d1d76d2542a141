//! Progress tracking service.
//!
//! [`ProgressTracker`] sits between a [`Storage`] collaborator and the pure
//! engine: it loads a snapshot, runs the engine, persists whatever changed,
//! and then runs the explicit recalculation step for any auto-tracked goal
//! the write touched.

use cadence_core::{
    EngineError, Goal, GoalId, GoalUpdate, Habit, HabitId, HabitLog, HabitState, HabitUpdate, Task, TaskId,
    TaskUpdate, Time,
};
use cadence_storage::Storage;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregator::{ProgressAggregator, ProgressReport};
use crate::analytics::{
    AnalyticsAggregator, AnalyticsReport, GoalSummary, Overview, StreakPoint, TaskTrendPoint, Window,
};
use crate::config::EngineConfig;
use crate::error::{Result, TrackerError};
use crate::logbook::LogBook;
use crate::recurrence::Schedulable;
use crate::streak::{LogOutcome, StreakCheck, StreakEngine};
use crate::time_status::{TimeStatus, TimeStatusCalculator};

/// A habit scheduled on a day, with what has been logged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueHabit {
    /// Habit
    pub habit: Habit,
    /// Logged state, `Pending` when nothing is logged
    pub state: HabitState,
}

/// A task scheduled on a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueTask {
    /// Task
    pub task: Task,
    /// Whether it counts as done that day
    pub completed: bool,
}

/// Everything scheduled on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueItems {
    /// Day
    pub date: NaiveDate,
    /// Habits due
    pub habits: Vec<DueHabit>,
    /// Tasks due
    pub tasks: Vec<DueTask>,
}

/// Entities loaded for one computation.
struct Snapshot {
    habits: Vec<Habit>,
    logs: Vec<HabitLog>,
    goals: Vec<Goal>,
    tasks: Vec<Task>,
}

/// Progress tracking service over a storage backend.
pub struct ProgressTracker<S: Storage> {
    storage: S,
    config: EngineConfig,
    streaks: StreakEngine,
    aggregator: ProgressAggregator,
    time: TimeStatusCalculator,
    analytics: AnalyticsAggregator,
    clock: Option<Time>,
}

impl<S: Storage> ProgressTracker<S> {
    /// Create a tracker with the default configuration.
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, EngineConfig::default())
    }

    /// Create a tracker with a custom configuration.
    pub fn with_config(storage: S, config: EngineConfig) -> Self {
        Self {
            storage,
            aggregator: ProgressAggregator::new(config.lookback_days),
            time: TimeStatusCalculator::new(config.behind_tolerance),
            streaks: StreakEngine::new(),
            analytics: AnalyticsAggregator::new(),
            config,
            clock: None,
        }
    }

    /// Pin the clock to `now` instead of the system time.
    pub fn with_clock(mut self, now: Time) -> Self {
        self.clock = Some(now);
        self
    }

    /// Pin the clock to the start of `today` (UTC).
    pub fn with_today(self, today: NaiveDate) -> Self {
        let now = Utc.from_utc_datetime(&today.and_time(NaiveTime::MIN));
        self.with_clock(now)
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Current time.
    pub fn now(&self) -> Time {
        self.clock.unwrap_or_else(Utc::now)
    }

    /// Current calendar day.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            habits: self.storage.list_habits().await?,
            logs: self.storage.list_habit_logs().await?,
            goals: self.storage.list_goals().await?,
            tasks: self.storage.list_tasks().await?,
        })
    }

    async fn habit(&self, id: HabitId) -> Result<Habit> {
        self.storage
            .load_habit(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("habit", id))
    }

    async fn goal(&self, id: GoalId) -> Result<Goal> {
        self.storage
            .load_goal(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("goal", id))
    }

    async fn task(&self, id: TaskId) -> Result<Task> {
        self.storage
            .load_task(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("task", id))
    }

    /// Roll back uncommitted writes when `result` is an error.
    async fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            match self.storage.rollback().await {
                Ok(()) => debug!(error = %e, "rolled back"),
                Err(rb) => warn!(error = %e, rollback = %rb, "rollback failed"),
            }
        }
        result
    }

    // === Habits ===

    /// Store a new habit.
    pub async fn add_habit(&mut self, habit: Habit) -> Result<Habit> {
        let result = async {
            require_text("name", &habit.name)?;
            habit.frequency.validate()?;

            self.storage.save_habit(&habit).await?;
            self.storage.commit(&format!("Add habit: {}", habit.name)).await?;
            info!(habit = %habit.id, name = %habit.name, "habit added");
            Ok::<_, TrackerError>(habit)
        }
        .await;
        self.settle(result).await
    }

    /// Apply an edit to a habit.
    ///
    /// Linking a habit to a goal through the edit also updates the goal's
    /// linked set.
    pub async fn update_habit(&mut self, id: HabitId, update: HabitUpdate) -> Result<Habit> {
        let result = async {
            let mut habit = self.habit(id).await?;
            let previous_goal = habit.linked_goal_id;
            let affects_progress = update.affects_progress();
            update.apply(&mut habit)?;

            self.storage.save_habit(&habit).await?;

            if habit.linked_goal_id != previous_goal {
                if let Some(goal_id) = previous_goal {
                    self.set_habit_link(goal_id, id, false).await?;
                }
                if let Some(goal_id) = habit.linked_goal_id {
                    self.set_habit_link(goal_id, id, true).await?;
                }
            } else if affects_progress {
                self.recalculate_linked(|g| g.linked_habit_ids.contains(&id)).await?;
            }

            self.storage.commit(&format!("Update habit: {}", habit.name)).await?;
            debug!(habit = %id, "habit updated");
            Ok::<_, TrackerError>(habit)
        }
        .await;
        self.settle(result).await
    }

    /// Log a day state for a habit and run the follow-up recalculation.
    pub async fn log_habit(&mut self, id: HabitId, date: NaiveDate, state: HabitState) -> Result<LogOutcome> {
        let result = async {
            let mut habit = self.habit(id).await?;
            let existing = self
                .storage
                .logs_in_range(id, date, date)
                .await?
                .into_iter()
                .next();

            let outcome = match self.streaks.log(&habit, existing.as_ref(), date, state) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(habit = %id, %date, %state, error = %e, "rejected log");
                    return Err(TrackerError::from(e));
                }
            };

            let day = match &outcome {
                LogOutcome::Recorded(day) => day.clone(),
                LogOutcome::AlreadyCompleted => {
                    info!(habit = %id, %date, "already completed");
                    return Ok(outcome);
                }
            };

            self.storage.save_habit_log(&day.log).await?;
            if day.streak_changed() {
                self.streaks.apply(&mut habit, &day);
                self.storage.save_habit(&habit).await?;
            }
            info!(
                habit = %id,
                %date,
                from = %day.previous_state,
                to = %state,
                current = day.after.current,
                best = day.after.best,
                "habit logged"
            );

            self.recalculate_linked(|g| g.linked_habit_ids.contains(&id)).await?;
            self.storage
                .commit(&format!("Log habit {}: {} on {}", habit.name, state, date))
                .await?;
            Ok::<_, TrackerError>(outcome)
        }
        .await;
        self.settle(result).await
    }

    /// Compare a habit's stored streak with its log history as of `as_of`.
    pub async fn verify_streak(&self, id: HabitId, as_of: NaiveDate) -> Result<StreakCheck> {
        let habit = self.habit(id).await?;
        let logs = self.storage.list_habit_logs().await?;
        let check = self.streaks.verify(&habit, &LogBook::new(&logs), as_of);
        if !check.is_consistent() {
            warn!(habit = %id, stored = check.stored, observed = check.observed, "streak drift");
        }
        Ok(check)
    }

    // === Tasks ===

    /// Store a new task.
    pub async fn add_task(&mut self, task: Task) -> Result<Task> {
        let result = async {
            require_text("title", &task.title)?;
            TaskUpdate::MonthDays(task.month_days.clone()).validate()?;

            self.storage.save_task(&task).await?;
            if let Some(goal_id) = task.linked_goal_id {
                self.set_task_link(goal_id, task.id, true).await?;
            }
            self.storage.commit(&format!("Add task: {}", task.title)).await?;
            info!(task = %task.id, title = %task.title, "task added");
            Ok::<_, TrackerError>(task)
        }
        .await;
        self.settle(result).await
    }

    /// Apply an edit to a task.
    pub async fn update_task(&mut self, id: TaskId, update: TaskUpdate) -> Result<Task> {
        let result = async {
            let mut task = self.task(id).await?;
            let previous_goal = task.linked_goal_id;
            let affects_progress = update.affects_progress();
            update.apply(&mut task)?;

            self.storage.save_task(&task).await?;

            if task.linked_goal_id != previous_goal {
                if let Some(goal_id) = previous_goal {
                    self.set_task_link(goal_id, id, false).await?;
                }
                if let Some(goal_id) = task.linked_goal_id {
                    self.set_task_link(goal_id, id, true).await?;
                }
            } else if affects_progress {
                self.recalculate_linked(|g| g.linked_task_ids.contains(&id)).await?;
            }

            self.storage.commit(&format!("Update task: {}", task.title)).await?;
            debug!(task = %id, "task updated");
            Ok::<_, TrackerError>(task)
        }
        .await;
        self.settle(result).await
    }

    /// Complete a one-time task, or toggle a recurring one for `date`.
    ///
    /// Returns whether the task counts as done on `date` afterwards.
    pub async fn complete_task(&mut self, id: TaskId, date: NaiveDate) -> Result<bool> {
        let result = async {
            let mut task = self.task(id).await?;
            let done = task.toggle_completion(date);

            self.storage.save_task(&task).await?;
            info!(task = %id, %date, done, "task toggled");

            self.recalculate_linked(|g| g.linked_task_ids.contains(&id)).await?;
            self.storage.commit(&format!("Complete task: {}", task.title)).await?;
            Ok::<_, TrackerError>(done)
        }
        .await;
        self.settle(result).await
    }

    /// Delete a task and drop it from every goal that links it.
    pub async fn delete_task(&mut self, id: TaskId) -> Result<Task> {
        let result = async {
            let task = self.task(id).await?;
            self.storage.delete_task(id).await?;

            let linking: Vec<GoalId> = self
                .storage
                .list_goals()
                .await?
                .into_iter()
                .filter(|g| g.linked_task_ids.contains(&id))
                .map(|g| g.id)
                .collect();
            for goal_id in linking {
                self.set_task_link(goal_id, id, false).await?;
            }

            self.storage.commit(&format!("Delete task: {}", task.title)).await?;
            info!(task = %id, title = %task.title, "task deleted");
            Ok::<_, TrackerError>(task)
        }
        .await;
        self.settle(result).await
    }

    // === Goals ===

    /// Store a new goal.
    pub async fn add_goal(&mut self, goal: Goal) -> Result<Goal> {
        let result = async {
            require_text("title", &goal.title)?;
            GoalUpdate::Tracking {
                tracking_type: goal.tracking_type,
                target_value: goal.target_value,
            }
            .validate(&goal)?;

            self.storage.save_goal(&goal).await?;
            let recalculated = if goal.auto_track {
                self.refresh_goal(goal.id).await?
            } else {
                None
            };
            self.storage.commit(&format!("Add goal: {}", goal.title)).await?;
            info!(goal = %goal.id, title = %goal.title, "goal added");

            Ok::<_, TrackerError>(match recalculated {
                Some(value) => Goal {
                    current_progress: value,
                    ..goal
                },
                None => goal,
            })
        }
        .await;
        self.settle(result).await
    }

    /// Apply an edit to a goal.
    pub async fn update_goal(&mut self, id: GoalId, update: GoalUpdate) -> Result<Goal> {
        let result = async {
            let mut goal = self.goal(id).await?;
            let affects_progress = update.affects_progress();
            update.apply(&mut goal)?;

            self.storage.save_goal(&goal).await?;
            if affects_progress && goal.auto_track {
                if let Some(value) = self.refresh_goal(id).await? {
                    goal.current_progress = value;
                }
            }
            self.storage.commit(&format!("Update goal: {}", goal.title)).await?;
            debug!(goal = %id, "goal updated");
            Ok::<_, TrackerError>(goal)
        }
        .await;
        self.settle(result).await
    }

    /// Set manual progress on a goal.
    pub async fn set_progress(&mut self, id: GoalId, value: f64) -> Result<Goal> {
        let result = async {
            let mut goal = self.goal(id).await?;
            if let Err(e) = self.aggregator.validate_progress_update(&goal, value) {
                warn!(goal = %id, value, error = %e, "rejected progress update");
                return Err(TrackerError::from(e));
            }

            goal.current_progress = value;
            self.storage.save_goal(&goal).await?;
            self.storage.commit(&format!("Set progress: {}", goal.title)).await?;
            info!(goal = %id, value, "progress set");
            Ok::<_, TrackerError>(goal)
        }
        .await;
        self.settle(result).await
    }

    /// Delete a goal and clear the back-reference on its linked habits and
    /// tasks.
    pub async fn delete_goal(&mut self, id: GoalId) -> Result<Goal> {
        let result = async {
            let goal = self.goal(id).await?;

            for habit_id in &goal.linked_habit_ids {
                if let Some(mut habit) = self.storage.load_habit(*habit_id).await? {
                    if habit.linked_goal_id == Some(id) {
                        habit.linked_goal_id = None;
                        self.storage.save_habit(&habit).await?;
                    }
                }
            }
            for task_id in &goal.linked_task_ids {
                if let Some(mut task) = self.storage.load_task(*task_id).await? {
                    if task.linked_goal_id == Some(id) {
                        task.linked_goal_id = None;
                        self.storage.save_task(&task).await?;
                    }
                }
            }

            self.storage.delete_goal(id).await?;
            self.storage.commit(&format!("Delete goal: {}", goal.title)).await?;
            info!(goal = %id, title = %goal.title, "goal deleted");
            Ok::<_, TrackerError>(goal)
        }
        .await;
        self.settle(result).await
    }

    /// Link a habit to a goal, then recalculate the goal.
    pub async fn link_habit(&mut self, goal_id: GoalId, habit_id: HabitId) -> Result<Goal> {
        self.relink_habit(goal_id, habit_id, true).await
    }

    /// Remove a habit from a goal, then recalculate the goal.
    pub async fn unlink_habit(&mut self, goal_id: GoalId, habit_id: HabitId) -> Result<Goal> {
        self.relink_habit(goal_id, habit_id, false).await
    }

    /// Link a task to a goal, then recalculate the goal.
    pub async fn link_task(&mut self, goal_id: GoalId, task_id: TaskId) -> Result<Goal> {
        self.relink_task(goal_id, task_id, true).await
    }

    /// Remove a task from a goal, then recalculate the goal.
    pub async fn unlink_task(&mut self, goal_id: GoalId, task_id: TaskId) -> Result<Goal> {
        self.relink_task(goal_id, task_id, false).await
    }

    async fn relink_habit(&mut self, goal_id: GoalId, habit_id: HabitId, linked: bool) -> Result<Goal> {
        let result = async {
            let mut habit = self.habit(habit_id).await?;
            let target = if linked { Some(goal_id) } else { None };
            if linked || habit.linked_goal_id == Some(goal_id) {
                habit.linked_goal_id = target;
                self.storage.save_habit(&habit).await?;
            }
            let goal = self.set_habit_link(goal_id, habit_id, linked).await?;
            self.storage
                .commit(&format!("Link habit {} to goal {}: {}", habit.name, goal.title, linked))
                .await?;
            Ok::<_, TrackerError>(goal)
        }
        .await;
        self.settle(result).await
    }

    async fn relink_task(&mut self, goal_id: GoalId, task_id: TaskId, linked: bool) -> Result<Goal> {
        let result = async {
            let mut task = self.task(task_id).await?;
            let target = if linked { Some(goal_id) } else { None };
            if linked || task.linked_goal_id == Some(goal_id) {
                task.linked_goal_id = target;
                self.storage.save_task(&task).await?;
            }
            let goal = self.set_task_link(goal_id, task_id, linked).await?;
            self.storage
                .commit(&format!("Link task {} to goal {}: {}", task.title, goal.title, linked))
                .await?;
            Ok::<_, TrackerError>(goal)
        }
        .await;
        self.settle(result).await
    }

    /// Add or remove a habit in a goal's linked set, then recalculate it.
    async fn set_habit_link(&mut self, goal_id: GoalId, habit_id: HabitId, linked: bool) -> Result<Goal> {
        let mut goal = self.goal(goal_id).await?;
        let changed = if linked {
            goal.linked_habit_ids.insert(habit_id)
        } else {
            goal.linked_habit_ids.remove(&habit_id)
        };
        if changed {
            self.storage.save_goal(&goal).await?;
            debug!(goal = %goal_id, habit = %habit_id, linked, "habit link changed");
            self.refresh_goal(goal_id).await?;
            goal = self.goal(goal_id).await?;
        }
        Ok(goal)
    }

    /// Add or remove a task in a goal's linked set, then recalculate it.
    async fn set_task_link(&mut self, goal_id: GoalId, task_id: TaskId, linked: bool) -> Result<Goal> {
        let mut goal = self.goal(goal_id).await?;
        let changed = if linked {
            goal.linked_task_ids.insert(task_id)
        } else {
            goal.linked_task_ids.remove(&task_id)
        };
        if changed {
            self.storage.save_goal(&goal).await?;
            debug!(goal = %goal_id, task = %task_id, linked, "task link changed");
            self.refresh_goal(goal_id).await?;
            goal = self.goal(goal_id).await?;
        }
        Ok(goal)
    }

    /// Recompute an auto-tracked goal and commit the value if it changed.
    ///
    /// Returns the new stored value, or `None` when nothing changed.
    pub async fn recalculate_goal(&mut self, id: GoalId) -> Result<Option<f64>> {
        let result = async {
            let value = self.refresh_goal(id).await?;
            if value.is_some() {
                self.storage.commit(&format!("Recalculate goal {}", id)).await?;
            }
            Ok::<_, TrackerError>(value)
        }
        .await;
        self.settle(result).await
    }

    /// Recompute one goal and save it if the value changed; no commit.
    async fn refresh_goal(&mut self, id: GoalId) -> Result<Option<f64>> {
        let snapshot = self.snapshot().await?;
        let goal = snapshot
            .goals
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| TrackerError::not_found("goal", id))?;
        self.persist_recalculation(goal, &snapshot).await
    }

    /// Recalculate every goal matching `affected`; returns how many changed.
    async fn recalculate_linked<F>(&mut self, affected: F) -> Result<usize>
    where
        F: Fn(&Goal) -> bool,
    {
        let snapshot = self.snapshot().await?;
        let mut changed = 0;
        for goal in snapshot.goals.iter().filter(|g| g.auto_track && affected(g)) {
            if self.persist_recalculation(goal, &snapshot).await?.is_some() {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn persist_recalculation(&mut self, goal: &Goal, snapshot: &Snapshot) -> Result<Option<f64>> {
        let logs = LogBook::new(&snapshot.logs);
        let value = self
            .aggregator
            .recalculate(goal, &snapshot.habits, &snapshot.tasks, &logs, self.today());

        if let Some(value) = value {
            let updated = Goal {
                current_progress: value,
                ..goal.clone()
            };
            self.storage.save_goal(&updated).await?;
            info!(goal = %goal.id, from = goal.current_progress, to = value, "goal progress recalculated");
        }
        Ok(value)
    }

    // === Queries ===

    /// Habits and tasks scheduled on `date`.
    pub async fn due_on(&self, date: NaiveDate) -> Result<DueItems> {
        let snapshot = self.snapshot().await?;
        let logs = LogBook::new(&snapshot.logs);

        let habits = snapshot
            .habits
            .iter()
            .filter(|h| h.is_due_on(date))
            .map(|h| DueHabit {
                state: logs.state_on(h.id, date),
                habit: h.clone(),
            })
            .collect();
        let tasks = snapshot
            .tasks
            .iter()
            .filter(|t| t.is_due_on(date) || (t.is_recurring() && t.is_completed_on(date)))
            .map(|t| DueTask {
                completed: t.is_completed_on(date),
                task: t.clone(),
            })
            .collect();

        Ok(DueItems { date, habits, tasks })
    }

    /// Progress report for one goal, auto-tracked contribution included.
    pub async fn goal_progress(&self, id: GoalId) -> Result<ProgressReport> {
        let snapshot = self.snapshot().await?;
        let goal = snapshot
            .goals
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| TrackerError::not_found("goal", id))?;
        Ok(self.report(goal, &snapshot))
    }

    /// Deadline status for one goal.
    pub async fn time_status(&self, id: GoalId) -> Result<TimeStatus> {
        let snapshot = self.snapshot().await?;
        let goal = snapshot
            .goals
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| TrackerError::not_found("goal", id))?;
        let pct = self.report(goal, &snapshot).percentage;
        Ok(self.time.status(goal, pct, self.now()))
    }

    /// Summaries of all goals, most urgent first.
    pub async fn goal_summaries(&self) -> Result<Vec<GoalSummary>> {
        let snapshot = self.snapshot().await?;
        let mut goals = snapshot.goals.clone();
        let now = self.now();
        let progress = |g: &Goal| self.report(g, &snapshot).percentage;

        self.time.sort_by_urgency(&mut goals, now, progress);
        Ok(self.analytics.goal_summaries(&goals, &self.time, now, progress))
    }

    /// The goal to surface first, if any goal is open.
    pub async fn primary_goal(&self) -> Result<Option<Goal>> {
        let snapshot = self.snapshot().await?;
        let progress = |g: &Goal| self.report(g, &snapshot).percentage;
        Ok(self
            .time
            .primary_goal(&snapshot.goals, self.now(), progress)
            .cloned())
    }

    /// Window statistics ending today.
    pub async fn analytics(&self, window: Window) -> Result<AnalyticsReport> {
        let snapshot = self.snapshot().await?;
        let logs = LogBook::new(&snapshot.logs);
        Ok(self
            .analytics
            .compute(&snapshot.habits, &logs, window.days(), self.today()))
    }

    /// Dashboard headline numbers.
    pub async fn overview(&self) -> Result<Overview> {
        let snapshot = self.snapshot().await?;
        let progress = |g: &Goal| self.report(g, &snapshot).percentage;
        Ok(self.analytics.overview(
            &snapshot.habits,
            &snapshot.goals,
            &snapshot.tasks,
            self.today(),
            progress,
        ))
    }

    /// Recurring task completions per day over the window.
    pub async fn task_trend(&self, window: Window) -> Result<Vec<TaskTrendPoint>> {
        let tasks = self.storage.list_tasks().await?;
        Ok(self
            .analytics
            .task_completion_trend(&tasks, window.days(), self.today()))
    }

    /// Combined habit streak per day over the window.
    pub async fn streak_history(&self, window: Window) -> Result<Vec<StreakPoint>> {
        let habits = self.storage.list_habits().await?;
        let logs = self.storage.list_habit_logs().await?;
        Ok(self
            .analytics
            .streak_history(&habits, &LogBook::new(&logs), window.days(), self.today()))
    }

    fn report(&self, goal: &Goal, snapshot: &Snapshot) -> ProgressReport {
        let logs = LogBook::new(&snapshot.logs);
        self.aggregator
            .compute_goal_progress(goal, &snapshot.habits, &snapshot.tasks, &logs, self.today())
    }
}

fn require_text(field: &'static str, value: &str) -> std::result::Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidUpdate {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{Difficulty, Frequency, TaskKind, TrackingType};
    use cadence_storage::{JsonStorage, MemoryStorage};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 17).unwrap()
    }

    fn tracker() -> ProgressTracker<MemoryStorage> {
        ProgressTracker::new(MemoryStorage::new()).with_today(today())
    }

    fn daily(name: &str) -> Habit {
        Habit::new(name, "health", Difficulty::Easy, Frequency::Daily)
    }

    fn auto_goal() -> Goal {
        let mut goal = Goal::new("Get fit", today() + Duration::days(60), TrackingType::Percentage);
        goal.auto_track = true;
        goal
    }

    #[tokio::test]
    async fn test_log_habit_updates_streak() {
        let mut t = tracker();
        let habit = t.add_habit(daily("Pushups")).await.unwrap();

        for back in [2, 1] {
            t.log_habit(habit.id, today() - Duration::days(back), HabitState::Done)
                .await
                .unwrap();
        }
        let stored = t.storage().load_habit(habit.id).await.unwrap().unwrap();
        assert_eq!((stored.current_streak, stored.best_streak), (2, 2));

        t.log_habit(habit.id, today(), HabitState::Missed).await.unwrap();
        let stored = t.storage().load_habit(habit.id).await.unwrap().unwrap();
        assert_eq!((stored.current_streak, stored.best_streak), (0, 2));
    }

    #[tokio::test]
    async fn test_double_done_is_reported_not_applied() {
        let mut t = tracker();
        let habit = t.add_habit(daily("Meditate")).await.unwrap();

        t.log_habit(habit.id, today(), HabitState::Done).await.unwrap();
        let commits = t.storage().commits().len();
        let again = t.log_habit(habit.id, today(), HabitState::Done).await.unwrap();

        assert_eq!(again, LogOutcome::AlreadyCompleted);
        assert_eq!(t.storage().commits().len(), commits);
        let stored = t.storage().load_habit(habit.id).await.unwrap().unwrap();
        assert_eq!(stored.current_streak, 1);
    }

    #[tokio::test]
    async fn test_pending_rejected() {
        let mut t = tracker();
        let habit = t.add_habit(daily("Meditate")).await.unwrap();
        let err = t.log_habit(habit.id, today(), HabitState::Pending).await.unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Engine(EngineError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_habit() {
        let mut t = tracker();
        let err = t.log_habit(HabitId::new(), today(), HabitState::Done).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { kind: "habit", .. }));
    }

    #[tokio::test]
    async fn test_logging_recalculates_linked_goal() {
        let mut t = tracker();
        let habit = t.add_habit(daily("Run")).await.unwrap();
        let goal = t.add_goal(auto_goal()).await.unwrap();
        t.link_habit(goal.id, habit.id).await.unwrap();

        for back in 0..3 {
            t.log_habit(habit.id, today() - Duration::days(back), HabitState::Done)
                .await
                .unwrap();
        }
        let stored = t.storage().load_goal(goal.id).await.unwrap().unwrap();
        assert_eq!(stored.current_progress, 10.0);

        let linked = t.storage().load_habit(habit.id).await.unwrap().unwrap();
        assert_eq!(linked.linked_goal_id, Some(goal.id));

        // Nothing changed, nothing to persist.
        assert_eq!(t.recalculate_goal(goal.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_task_completion_feeds_goal() {
        let mut t = tracker();
        let task = t.add_task(Task::new("Buy shoes", TaskKind::OneTime)).await.unwrap();
        let other = t.add_task(Task::new("Find a club", TaskKind::OneTime)).await.unwrap();
        let goal = t.add_goal(auto_goal()).await.unwrap();
        t.link_task(goal.id, task.id).await.unwrap();
        t.link_task(goal.id, other.id).await.unwrap();

        assert!(t.complete_task(task.id, today()).await.unwrap());
        let report = t.goal_progress(goal.id).await.unwrap();
        assert_eq!(report.percentage, 50.0);
    }

    #[tokio::test]
    async fn test_manual_progress_validation() {
        let mut t = tracker();
        let mut goal = Goal::new("Save", today() + Duration::days(30), TrackingType::Numeric);
        goal.target_value = Some(1000.0);
        let goal = t.add_goal(goal).await.unwrap();

        let updated = t.set_progress(goal.id, 250.0).await.unwrap();
        assert_eq!(t.goal_progress(updated.id).await.unwrap().percentage, 25.0);
        assert!(t.set_progress(goal.id, 2500.0).await.is_err());

        let auto = t.add_goal(auto_goal()).await.unwrap();
        assert!(matches!(
            t.set_progress(auto.id, 10.0).await,
            Err(TrackerError::Engine(EngineError::InvalidProgressValue { .. }))
        ));
    }

    #[tokio::test]
    async fn test_numeric_goal_requires_target() {
        let mut t = tracker();
        let goal = Goal::new("Pages", today(), TrackingType::Numeric);
        assert!(t.add_goal(goal).await.is_err());
    }

    #[tokio::test]
    async fn test_due_on() {
        let mut t = tracker();
        let mut weekdays = daily("Swim");
        weekdays.frequency = Frequency::SpecificWeekdays { days: [1, 3].into_iter().collect() };
        let swim = t.add_habit(weekdays).await.unwrap();
        let walk = t.add_habit(daily("Walk")).await.unwrap();
        t.update_habit(walk.id, HabitUpdate::Archived(true)).await.unwrap();
        t.add_task(Task::new("Plan week", TaskKind::Daily)).await.unwrap();

        // 2024-07-17 is a Wednesday, the 16th a Tuesday.
        let due = t.due_on(today()).await.unwrap();
        assert_eq!(due.habits.len(), 1);
        assert_eq!(due.habits[0].habit.id, swim.id);
        assert_eq!(due.habits[0].state, HabitState::Pending);
        assert_eq!(due.tasks.len(), 1);

        let tuesday = t.due_on(today() - Duration::days(1)).await.unwrap();
        assert!(tuesday.habits.is_empty());
    }

    #[tokio::test]
    async fn test_verify_streak() {
        let mut t = tracker();
        let habit = t.add_habit(daily("Read")).await.unwrap();
        t.log_habit(habit.id, today() - Duration::days(1), HabitState::Done).await.unwrap();
        t.log_habit(habit.id, today(), HabitState::Done).await.unwrap();
        let check = t.verify_streak(habit.id, today()).await.unwrap();
        assert!(check.is_consistent());
        assert_eq!(check.observed, 2);
    }

    #[tokio::test]
    async fn test_goal_summaries_and_overview() {
        let mut t = tracker();
        let habit = t.add_habit(daily("Stretch")).await.unwrap();
        t.log_habit(habit.id, today(), HabitState::Done).await.unwrap();

        let mut late = Goal::new("Late", today() - Duration::days(3), TrackingType::Percentage);
        late.created_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let late = t.add_goal(late).await.unwrap();
        let mut soon = Goal::new("Soon", today() + Duration::days(3), TrackingType::Percentage);
        soon.created_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        t.add_goal(soon).await.unwrap();

        let summaries = t.goal_summaries().await.unwrap();
        assert_eq!(summaries[0].goal_id, late.id);
        assert!(summaries[0].is_overdue);
        assert_eq!(t.primary_goal().await.unwrap().unwrap().id, late.id);

        let overview = t.overview().await.unwrap();
        assert_eq!(overview.active_habits, 1);
        assert_eq!(overview.total_current_streak, 1);
        assert_eq!(overview.active_goals, 2);

        let report = t.analytics(Window::Week).await.unwrap();
        assert_eq!(report.totals.done, 1);
        assert_eq!(report.completion_rate, 14);
    }

    #[tokio::test]
    async fn test_numeric_auto_goal_reports_auto_percentage() {
        let mut t = tracker();
        let mut goal = Goal::new("Plan the trip", today() + Duration::days(20), TrackingType::Numeric);
        goal.target_value = Some(3.0);
        goal.auto_track = true;
        let goal = t.add_goal(goal).await.unwrap();
        let booked = t.add_task(Task::new("Book hotel", TaskKind::OneTime)).await.unwrap();
        let rented = t.add_task(Task::new("Rent car", TaskKind::OneTime)).await.unwrap();
        t.link_task(goal.id, booked.id).await.unwrap();
        t.link_task(goal.id, rented.id).await.unwrap();

        t.complete_task(booked.id, today()).await.unwrap();
        let report = t.goal_progress(goal.id).await.unwrap();
        assert_eq!(report.percentage, 50.0);
        let stored = t.storage().load_goal(goal.id).await.unwrap().unwrap();
        assert!((stored.current_progress - 1.5).abs() < 1e-9);
        assert_eq!(t.goal_summaries().await.unwrap()[0].progress, 50.0);
    }

    #[tokio::test]
    async fn test_task_kind_change_recalculates_goal() {
        let mut t = tracker();
        let task = t.add_task(Task::new("Sign up for gym", TaskKind::OneTime)).await.unwrap();
        let goal = t.add_goal(auto_goal()).await.unwrap();
        t.link_task(goal.id, task.id).await.unwrap();
        t.complete_task(task.id, today()).await.unwrap();
        assert_eq!(t.goal_progress(goal.id).await.unwrap().percentage, 100.0);

        // As a daily task it has no completion for today.
        let updated = t.update_task(task.id, TaskUpdate::Kind(TaskKind::Daily)).await.unwrap();
        assert_eq!(updated.kind, TaskKind::Daily);
        let stored = t.storage().load_goal(goal.id).await.unwrap().unwrap();
        assert_eq!(stored.current_progress, 0.0);
    }

    #[tokio::test]
    async fn test_goal_completion_and_auto_toggle() {
        let mut t = tracker();
        let goal = t.add_goal(auto_goal()).await.unwrap();

        t.update_goal(goal.id, GoalUpdate::AutoTrack(false)).await.unwrap();
        let manual = t.set_progress(goal.id, 30.0).await.unwrap();
        assert_eq!(manual.current_progress, 30.0);

        t.update_goal(goal.id, GoalUpdate::Completed(true)).await.unwrap();
        let overview = t.overview().await.unwrap();
        assert_eq!((overview.active_goals, overview.completed_goals), (0, 1));
        let status = t.time_status(goal.id).await.unwrap();
        assert_eq!(status.status, crate::time_status::GoalStatus::Completed);
    }

    #[tokio::test]
    async fn test_failed_update_rolls_back() {
        let mut t = tracker();
        let habit = t.add_habit(daily("Yoga")).await.unwrap();

        let err = t
            .update_habit(habit.id, HabitUpdate::LinkedGoal(Some(GoalId::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { kind: "goal", .. }));
        assert_eq!(t.storage().rollbacks(), 1);
        let stored = t.storage().load_habit(habit.id).await.unwrap().unwrap();
        assert_eq!(stored.linked_goal_id, None);

        let mut orphan = Task::new("Orphan", TaskKind::OneTime);
        orphan.linked_goal_id = Some(GoalId::new());
        assert!(t.add_task(orphan.clone()).await.is_err());
        assert!(t.storage().load_task(orphan.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_task_unlinks_goal() {
        let mut t = tracker();
        let done = t.add_task(Task::new("Buy bike", TaskKind::OneTime)).await.unwrap();
        let open = t.add_task(Task::new("Plan route", TaskKind::OneTime)).await.unwrap();
        let goal = t.add_goal(auto_goal()).await.unwrap();
        t.link_task(goal.id, done.id).await.unwrap();
        t.link_task(goal.id, open.id).await.unwrap();
        t.complete_task(done.id, today()).await.unwrap();

        t.delete_task(open.id).await.unwrap();
        assert!(t.storage().load_task(open.id).await.unwrap().is_none());
        let stored = t.storage().load_goal(goal.id).await.unwrap().unwrap();
        assert!(!stored.linked_task_ids.contains(&open.id));
        assert_eq!(stored.current_progress, 100.0);

        assert!(matches!(
            t.delete_task(open.id).await,
            Err(TrackerError::NotFound { kind: "task", .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_goal_clears_links() {
        let mut t = tracker();
        let habit = t.add_habit(daily("Climb")).await.unwrap();
        let task = t.add_task(Task::new("Buy shoes", TaskKind::OneTime)).await.unwrap();
        let goal = t.add_goal(auto_goal()).await.unwrap();
        t.link_habit(goal.id, habit.id).await.unwrap();
        t.link_task(goal.id, task.id).await.unwrap();

        let deleted = t.delete_goal(goal.id).await.unwrap();
        assert_eq!(deleted.id, goal.id);
        assert!(t.storage().load_goal(goal.id).await.unwrap().is_none());
        let habit = t.storage().load_habit(habit.id).await.unwrap().unwrap();
        assert_eq!(habit.linked_goal_id, None);
        let task = t.storage().load_task(task.id).await.unwrap().unwrap();
        assert_eq!(task.linked_goal_id, None);
    }

    #[tokio::test]
    async fn test_streak_history() {
        let mut t = tracker();
        let habit = t.add_habit(daily("Plank")).await.unwrap();
        for back in [1, 0] {
            t.log_habit(habit.id, today() - Duration::days(back), HabitState::Done)
                .await
                .unwrap();
        }
        let history = t.streak_history(Window::Week).await.unwrap();
        let values: Vec<u32> = history.iter().map(|p| p.streak).collect();
        assert_eq!(values, [0, 0, 0, 0, 0, 1, 2]);
    }

    #[tokio::test]
    async fn test_json_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let habit_id = {
            let storage = JsonStorage::new(dir.path()).await.unwrap();
            let mut t = ProgressTracker::new(storage).with_today(today());
            let habit = t.add_habit(daily("Journal")).await.unwrap();
            t.log_habit(habit.id, today(), HabitState::Done).await.unwrap();
            assert!(!t.storage().is_pending().await);
            habit.id
        };

        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let mut t = ProgressTracker::new(storage).with_today(today());
        let again = t.log_habit(habit_id, today(), HabitState::Done).await.unwrap();
        assert_eq!(again, LogOutcome::AlreadyCompleted);
        let due = t.due_on(today()).await.unwrap();
        assert_eq!(due.habits[0].state, HabitState::Done);
        assert_eq!(due.habits[0].habit.current_streak, 1);
    }

    #[tokio::test]
    async fn test_update_habit_link_syncs_goal() {
        let mut t = tracker();
        let habit = t.add_habit(daily("Cycle")).await.unwrap();
        let goal = t.add_goal(auto_goal()).await.unwrap();

        t.update_habit(habit.id, HabitUpdate::LinkedGoal(Some(goal.id))).await.unwrap();
        let stored = t.storage().load_goal(goal.id).await.unwrap().unwrap();
        assert!(stored.linked_habit_ids.contains(&habit.id));

        t.update_habit(habit.id, HabitUpdate::LinkedGoal(None)).await.unwrap();
        let stored = t.storage().load_goal(goal.id).await.unwrap().unwrap();
        assert!(stored.linked_habit_ids.is_empty());
    }
}
