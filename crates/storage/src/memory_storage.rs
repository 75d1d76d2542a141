//! In-memory storage, for tests and throwaway sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use cadence_core::{Goal, GoalId, Habit, HabitId, HabitLog, Task, TaskId};
use chrono::NaiveDate;

use super::{Result, Storage};

#[derive(Debug, Default, Clone)]
struct Tables {
    habits: HashMap<HabitId, Habit>,
    logs: HashMap<(HabitId, NaiveDate), HabitLog>,
    goals: HashMap<GoalId, Goal>,
    tasks: HashMap<TaskId, Task>,
}

/// Storage backend that keeps everything in hash maps.
///
/// A copy of the tables is taken at each commit; `rollback` restores it.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    live: Tables,
    committed: Tables,
    commits: Vec<String>,
    rollbacks: usize,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages passed to `commit`, oldest first.
    pub fn commits(&self) -> &[String] {
        &self.commits
    }

    /// Number of `rollback` calls.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_habit(&mut self, habit: &Habit) -> Result<()> {
        self.live.habits.insert(habit.id, habit.clone());
        Ok(())
    }

    async fn load_habit(&self, id: HabitId) -> Result<Option<Habit>> {
        Ok(self.live.habits.get(&id).cloned())
    }

    async fn list_habits(&self) -> Result<Vec<Habit>> {
        let mut habits: Vec<Habit> = self.live.habits.values().cloned().collect();
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(habits)
    }

    async fn save_habit_log(&mut self, log: &HabitLog) -> Result<()> {
        self.live.logs.insert((log.habit_id, log.date), log.clone());
        Ok(())
    }

    async fn list_habit_logs(&self) -> Result<Vec<HabitLog>> {
        let mut logs: Vec<HabitLog> = self.live.logs.values().cloned().collect();
        logs.sort_by_key(|l| l.date);
        Ok(logs)
    }

    async fn save_goal(&mut self, goal: &Goal) -> Result<()> {
        self.live.goals.insert(goal.id, goal.clone());
        Ok(())
    }

    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        Ok(self.live.goals.get(&id).cloned())
    }

    async fn list_goals(&self) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = self.live.goals.values().cloned().collect();
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(goals)
    }

    async fn delete_goal(&mut self, id: GoalId) -> Result<()> {
        self.live.goals.remove(&id);
        Ok(())
    }

    async fn save_task(&mut self, task: &Task) -> Result<()> {
        self.live.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn load_task(&self, id: TaskId) -> Result<Option<Task>> {
        Ok(self.live.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self.live.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn delete_task(&mut self, id: TaskId) -> Result<()> {
        self.live.tasks.remove(&id);
        Ok(())
    }

    async fn commit(&mut self, message: &str) -> Result<()> {
        self.committed = self.live.clone();
        self.commits.push(message.to_string());
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.live = self.committed.clone();
        self.rollbacks += 1;
        Ok(())
    }
}
