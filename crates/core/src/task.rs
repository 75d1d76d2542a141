//! Task model - one-off or recurring to-dos.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::id::{GoalId, TaskId};
use crate::Time;

/// A to-do item, either one-off or recurring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Task title
    pub title: String,

    /// Recurrence kind
    pub kind: TaskKind,

    /// Explicit dates a monthly task falls on
    #[serde(default)]
    pub dates: BTreeSet<NaiveDate>,

    /// Days of the month a monthly task recurs on (1..=31)
    #[serde(default)]
    pub month_days: BTreeSet<u8>,

    /// Completion flag, used by one-time tasks only
    #[serde(default)]
    pub completed: bool,

    /// Days a recurring task was completed
    #[serde(default)]
    pub completed_dates: BTreeSet<NaiveDate>,

    /// Goal this task contributes to
    #[serde(default)]
    pub linked_goal_id: Option<GoalId>,

    /// Category key
    #[serde(default)]
    pub category: Option<String>,

    /// When created
    pub created_at: Time,
}

impl Task {
    /// Create a new open task.
    pub fn new(title: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            kind,
            dates: BTreeSet::new(),
            month_days: BTreeSet::new(),
            completed: false,
            completed_dates: BTreeSet::new(),
            linked_goal_id: None,
            category: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Whether the task repeats.
    pub fn is_recurring(&self) -> bool {
        !matches!(self.kind, TaskKind::OneTime)
    }

    /// Whether the task counts as done for `date`.
    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        match self.kind {
            TaskKind::OneTime => self.completed,
            TaskKind::Daily | TaskKind::Monthly => self.completed_dates.contains(&date),
        }
    }

    /// Mark a one-time task complete, or toggle a recurring task for `date`.
    ///
    /// Returns the completion state for `date` after the change.
    pub fn toggle_completion(&mut self, date: NaiveDate) -> bool {
        match self.kind {
            TaskKind::OneTime => {
                self.completed = true;
                true
            }
            TaskKind::Daily | TaskKind::Monthly => {
                if !self.completed_dates.remove(&date) {
                    self.completed_dates.insert(date);
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Recurrence kind for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Every day
    Daily,
    /// Once, until completed
    OneTime,
    /// On chosen days of the month
    Monthly,
}

impl TaskKind {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::OneTime => "One-time",
            Self::Monthly => "Monthly",
        }
    }
}

impl FromStr for TaskKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "one-time" | "onetime" | "once" => Ok(Self::OneTime),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::invalid_update(
                "kind",
                format!("unknown task kind '{}'", other),
            )),
        }
    }
}
