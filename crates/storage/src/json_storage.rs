//! JSON file storage implementation.
//!
//! Stores data as JSON files under a root directory (`.cadence` by default)
//! and keeps small per-object meta markers (version + updated_at). Log rows
//! are named `<habit>_<date>.json`, so one habit has at most one row per day.
//!
//! Every file touched since the last commit is journaled with its previous
//! contents, which is what `rollback` restores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cadence_core::{format_date, Goal, GoalId, Habit, HabitId, HabitLog, Task, TaskId};
use chrono::NaiveDate;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Result, Storage};

/// Previous contents of each file written since the last commit; `None`
/// when the file did not exist.
type Journal = Vec<(PathBuf, Option<Vec<u8>>)>;

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    journal: Arc<Mutex<Journal>>,
}

impl JsonStorage {
    /// Create storage, creating the data and meta subdirectories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        for kind in ["habits", "logs", "goals", "tasks"] {
            fs::create_dir_all(root.join(kind)).await?;
            fs::create_dir_all(root.join("meta").join(kind)).await?;
        }

        debug!(root = %root.display(), "opened json storage");
        Ok(Self {
            root,
            journal: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn habit_path(&self, id: HabitId) -> PathBuf {
        self.root.join("habits").join(format!("{}.json", id))
    }
    fn log_key(habit_id: HabitId, date: NaiveDate) -> String {
        format!("{}_{}", habit_id, format_date(date))
    }
    fn log_path(&self, key: &str) -> PathBuf {
        self.root.join("logs").join(format!("{}.json", key))
    }
    fn goal_path(&self, id: GoalId) -> PathBuf {
        self.root.join("goals").join(format!("{}.json", id))
    }
    fn task_path(&self, id: TaskId) -> PathBuf {
        self.root.join("tasks").join(format!("{}.json", id))
    }

    fn meta_path(&self, kind: &str, id: &str) -> PathBuf {
        self.root.join("meta").join(kind).join(format!("{}.meta.json", id))
    }

    /// Record what `path` held before its first write since the last commit.
    async fn journal(&self, path: &Path) -> Result<()> {
        let mut journal = self.journal.lock().await;
        if journal.iter().any(|(p, _)| p == path) {
            return Ok(());
        }
        let before = match fs::read(path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        journal.push((path.to_path_buf(), before));
        Ok(())
    }

    /// Whether writes happened since the last commit or rollback.
    pub async fn is_pending(&self) -> bool {
        !self.journal.lock().await.is_empty()
    }

    /// Read and increment per-object version, return new version.
    async fn bump_version(&self, kind: &str, id: &str) -> Result<u64> {
        let path = self.meta_path(kind, id);
        let mut version = 0u64;
        if let Ok(s) = fs::read_to_string(&path).await {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&s) {
                if let Some(v) = json.get("version").and_then(|v| v.as_u64()) {
                    version = v;
                }
            }
        }
        version += 1;
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        fs::write(&path, serde_json::to_string_pretty(&meta)?.as_bytes()).await?;
        Ok(version)
    }

    async fn write_object<T: serde::Serialize>(&self, kind: &str, id: &str, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.journal(path).await?;
        self.journal(&self.meta_path(kind, id)).await?;
        fs::write(path, json.as_bytes()).await?;
        let version = self.bump_version(kind, id).await?;
        debug!(kind, id, version, "saved object");
        Ok(())
    }

    async fn remove_object(&self, kind: &str, id: &str, path: &Path) -> Result<()> {
        let meta = self.meta_path(kind, id);
        self.journal(path).await?;
        self.journal(&meta).await?;
        remove_if_exists(path).await?;
        remove_if_exists(&meta).await?;
        debug!(kind, id, "removed object");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save_habit(&mut self, habit: &Habit) -> Result<()> {
        let path = self.habit_path(habit.id);
        self.write_object("habits", &habit.id.to_string(), &path, habit).await
    }

    async fn load_habit(&self, id: HabitId) -> Result<Option<Habit>> {
        read_json(&self.habit_path(id)).await
    }

    async fn list_habits(&self) -> Result<Vec<Habit>> {
        let mut habits: Vec<Habit> = list_dir(&self.root.join("habits")).await?;
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(habits)
    }

    async fn save_habit_log(&mut self, log: &HabitLog) -> Result<()> {
        let key = Self::log_key(log.habit_id, log.date);
        let path = self.log_path(&key);
        self.write_object("logs", &key, &path, log).await
    }

    async fn list_habit_logs(&self) -> Result<Vec<HabitLog>> {
        let mut logs: Vec<HabitLog> = list_dir(&self.root.join("logs")).await?;
        logs.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(logs)
    }

    async fn logs_in_range(&self, habit_id: HabitId, start: NaiveDate, end: NaiveDate) -> Result<Vec<HabitLog>> {
        // File names carry habit and date, so filter before parsing.
        let prefix = format!("{}_", habit_id);
        let mut logs = Vec::new();
        let mut rd = fs::read_dir(self.root.join("logs")).await?;
        while let Some(entry) = rd.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            let Some(date) = stem.strip_prefix(&prefix) else {
                continue;
            };
            let Ok(date) = cadence_core::parse_date(date) else {
                continue;
            };
            if date < start || date > end {
                continue;
            }
            if let Some(log) = read_json::<HabitLog>(&entry.path()).await? {
                logs.push(log);
            }
        }
        logs.sort_by_key(|l| l.date);
        Ok(logs)
    }

    async fn save_goal(&mut self, goal: &Goal) -> Result<()> {
        let path = self.goal_path(goal.id);
        self.write_object("goals", &goal.id.to_string(), &path, goal).await
    }

    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        read_json(&self.goal_path(id)).await
    }

    async fn list_goals(&self) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = list_dir(&self.root.join("goals")).await?;
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(goals)
    }

    async fn delete_goal(&mut self, id: GoalId) -> Result<()> {
        let path = self.goal_path(id);
        self.remove_object("goals", &id.to_string(), &path).await
    }

    async fn save_task(&mut self, task: &Task) -> Result<()> {
        let path = self.task_path(task.id);
        self.write_object("tasks", &task.id.to_string(), &path, task).await
    }

    async fn load_task(&self, id: TaskId) -> Result<Option<Task>> {
        read_json(&self.task_path(id)).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = list_dir(&self.root.join("tasks")).await?;
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn delete_task(&mut self, id: TaskId) -> Result<()> {
        let path = self.task_path(id);
        self.remove_object("tasks", &id.to_string(), &path).await
    }

    async fn commit(&mut self, message: &str) -> Result<()> {
        // No history is kept; commit only forgets the journal.
        let mut journal = self.journal.lock().await;
        debug!(message, files = journal.len(), "commit");
        journal.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let mut journal = self.journal.lock().await;
        let restored = journal.len();
        while let Some((path, before)) = journal.pop() {
            match before {
                Some(bytes) => fs::write(&path, bytes).await?,
                None => remove_if_exists(&path).await?,
            }
        }
        debug!(restored, "rollback");
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&entry.path()).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!(path = %entry.path().display(), error = %e, "skipping unreadable file"),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{Difficulty, Frequency, HabitState, TaskKind, TrackingType};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[tokio::test]
    async fn test_habit_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let habit = Habit::new("Stretch", "health", Difficulty::Easy, Frequency::Daily);
        storage.save_habit(&habit).await.unwrap();

        let loaded = storage.load_habit(habit.id).await.unwrap().unwrap();
        assert_eq!(loaded, habit);
        assert_eq!(storage.list_habits().await.unwrap().len(), 1);
        assert!(storage.load_habit(HabitId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_log_is_unique_per_habit_and_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let habit_id = HabitId::new();

        storage.save_habit_log(&HabitLog::new(habit_id, day(1), HabitState::Skipped)).await.unwrap();
        storage.save_habit_log(&HabitLog::new(habit_id, day(1), HabitState::Missed)).await.unwrap();

        let logs = storage.list_habit_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].state, HabitState::Missed);
    }

    #[tokio::test]
    async fn test_logs_in_range_filters_habit_and_dates() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let a = HabitId::new();
        let b = HabitId::new();

        for d in 1..=5 {
            storage.save_habit_log(&HabitLog::new(a, day(d), HabitState::Done)).await.unwrap();
        }
        storage.save_habit_log(&HabitLog::new(b, day(3), HabitState::Done)).await.unwrap();

        let logs = storage.logs_in_range(a, day(2), day(4)).await.unwrap();
        let dates: Vec<_> = logs.iter().map(|l| l.date).collect();
        assert_eq!(dates, vec![day(2), day(3), day(4)]);
    }

    #[tokio::test]
    async fn test_meta_version_bumps_and_pending_clears() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let goal = Goal::new("Learn Rust", day(30), TrackingType::Percentage);

        storage.save_goal(&goal).await.unwrap();
        storage.save_goal(&goal).await.unwrap();
        assert!(storage.is_pending().await);

        let meta = std::fs::read_to_string(storage.meta_path("goals", &goal.id.to_string())).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&meta).unwrap();
        assert_eq!(meta["version"], 2);

        storage.commit("save goal").await.unwrap();
        assert!(!storage.is_pending().await);
    }

    #[tokio::test]
    async fn test_rollback_restores_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let goal = Goal::new("Learn Rust", day(30), TrackingType::Percentage);
        storage.save_goal(&goal).await.unwrap();
        storage.commit("add goal").await.unwrap();

        let renamed = Goal { title: "Learn Go".into(), ..goal.clone() };
        storage.save_goal(&renamed).await.unwrap();
        storage.save_goal(&Goal { current_progress: 40.0, ..renamed }).await.unwrap();
        let task = Task::new("Read the book", TaskKind::OneTime);
        storage.save_task(&task).await.unwrap();
        assert!(storage.is_pending().await);

        storage.rollback().await.unwrap();
        assert!(!storage.is_pending().await);
        assert_eq!(storage.load_goal(goal.id).await.unwrap(), Some(goal.clone()));
        assert!(storage.load_task(task.id).await.unwrap().is_none());

        let meta = std::fs::read_to_string(storage.meta_path("goals", &goal.id.to_string())).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&meta).unwrap();
        assert_eq!(meta["version"], 1);
        assert!(!storage.meta_path("tasks", &task.id.to_string()).exists());
    }

    #[tokio::test]
    async fn test_rollback_restores_deleted_goal() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let goal = Goal::new("Run a 10k", day(20), TrackingType::Percentage);
        storage.save_goal(&goal).await.unwrap();
        storage.commit("add goal").await.unwrap();

        storage.delete_goal(goal.id).await.unwrap();
        assert!(storage.load_goal(goal.id).await.unwrap().is_none());
        storage.rollback().await.unwrap();
        assert_eq!(storage.load_goal(goal.id).await.unwrap(), Some(goal));
    }

    #[tokio::test]
    async fn test_delete_task_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let task = Task::new("Call mom", TaskKind::OneTime);

        storage.save_task(&task).await.unwrap();
        storage.delete_task(task.id).await.unwrap();
        storage.delete_task(task.id).await.unwrap();
        assert!(storage.list_tasks().await.unwrap().is_empty());
    }
}
