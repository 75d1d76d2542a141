//! Storage trait abstraction.

use async_trait::async_trait;
use cadence_core::{Goal, GoalId, Habit, HabitId, HabitLog, Task, TaskId};
use chrono::NaiveDate;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage abstraction for Cadence data.
///
/// The engine never talks to storage itself; callers load snapshots through
/// this trait, run the engine, and write results back.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Habit operations ===

    /// Save a habit (create or update).
    async fn save_habit(&mut self, habit: &Habit) -> Result<()>;

    /// Load a habit by ID.
    async fn load_habit(&self, id: HabitId) -> Result<Option<Habit>>;

    /// List all habits, archived included.
    async fn list_habits(&self) -> Result<Vec<Habit>>;

    // === Habit log operations ===

    /// Save a log row. A row for the same habit and date is replaced.
    async fn save_habit_log(&mut self, log: &HabitLog) -> Result<()>;

    /// List every log row.
    async fn list_habit_logs(&self) -> Result<Vec<HabitLog>>;

    /// Logs for one habit with `start <= date <= end`, oldest first.
    async fn logs_in_range(
        &self,
        habit_id: HabitId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitLog>> {
        let mut logs: Vec<HabitLog> = self
            .list_habit_logs()
            .await?
            .into_iter()
            .filter(|l| l.habit_id == habit_id && l.date >= start && l.date <= end)
            .collect();
        logs.sort_by_key(|l| l.date);
        Ok(logs)
    }

    // === Goal operations ===

    /// Save a goal (create or update).
    async fn save_goal(&mut self, goal: &Goal) -> Result<()>;

    /// Load a goal by ID.
    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>>;

    /// List all goals.
    async fn list_goals(&self) -> Result<Vec<Goal>>;

    /// Delete a goal.
    async fn delete_goal(&mut self, id: GoalId) -> Result<()>;

    // === Task operations ===

    /// Save a task (create or update).
    async fn save_task(&mut self, task: &Task) -> Result<()>;

    /// Load a task by ID.
    async fn load_task(&self, id: TaskId) -> Result<Option<Task>>;

    /// List all tasks.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Delete a task.
    async fn delete_task(&mut self, id: TaskId) -> Result<()>;

    // === Transaction support ===

    /// Commit pending changes with a message.
    async fn commit(&mut self, message: &str) -> Result<()>;

    /// Undo every write since the last commit.
    async fn rollback(&mut self) -> Result<()>;
}
