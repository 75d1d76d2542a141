//! Goal model - a dated objective with progress tracking.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::id::{GoalId, HabitId, MilestoneId, TaskId};
use crate::Time;

/// A goal the user works towards by a target date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier
    pub id: GoalId,

    /// Goal title
    pub title: String,

    /// Why the goal matters
    #[serde(default)]
    pub why: Option<String>,

    /// Day the goal should be reached by
    pub target_date: NaiveDate,

    /// When created
    pub created_at: Time,

    /// How progress is measured
    pub tracking_type: TrackingType,

    /// Raw stored progress; meaning depends on `tracking_type`
    #[serde(default)]
    pub current_progress: f64,

    /// Target for numeric goals
    #[serde(default)]
    pub target_value: Option<f64>,

    /// Checklist items
    #[serde(default)]
    pub milestones: Vec<Milestone>,

    /// Habits feeding auto-tracked progress
    #[serde(default)]
    pub linked_habit_ids: BTreeSet<HabitId>,

    /// Tasks feeding auto-tracked progress
    #[serde(default)]
    pub linked_task_ids: BTreeSet<TaskId>,

    /// Derive progress from linked habits and tasks
    #[serde(default)]
    pub auto_track: bool,

    /// Marked complete by the user
    #[serde(default)]
    pub completed: bool,

    /// Category key
    #[serde(default)]
    pub category: Option<String>,
}

impl Goal {
    /// Create a new goal with no progress and nothing linked.
    pub fn new(title: impl Into<String>, target_date: NaiveDate, tracking_type: TrackingType) -> Self {
        Self {
            id: GoalId::new(),
            title: title.into(),
            why: None,
            target_date,
            created_at: chrono::Utc::now(),
            tracking_type,
            current_progress: 0.0,
            target_value: None,
            milestones: Vec::new(),
            linked_habit_ids: BTreeSet::new(),
            linked_task_ids: BTreeSet::new(),
            auto_track: false,
            completed: false,
            category: None,
        }
    }

    /// Whether any habit or task is linked.
    pub fn has_links(&self) -> bool {
        !self.linked_habit_ids.is_empty() || !self.linked_task_ids.is_empty()
    }

    /// Number of completed milestones.
    pub fn completed_milestones(&self) -> usize {
        self.milestones.iter().filter(|m| m.completed).count()
    }
}

/// How goal progress is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingType {
    /// 0-100 value entered directly
    Percentage,
    /// Count against `target_value`
    Numeric,
    /// Share of completed milestones
    Checklist,
}

impl TrackingType {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Numeric => "numeric",
            Self::Checklist => "checklist",
        }
    }
}

impl FromStr for TrackingType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "percentage" | "percent" => Ok(Self::Percentage),
            "numeric" => Ok(Self::Numeric),
            "checklist" => Ok(Self::Checklist),
            other => Err(EngineError::invalid_update(
                "tracking_type",
                format!("unknown tracking type '{}'", other),
            )),
        }
    }
}

/// A checklist item nested in a goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier
    pub id: MilestoneId,

    /// Title
    pub title: String,

    /// Whether it has been reached
    #[serde(default)]
    pub completed: bool,
}

impl Milestone {
    /// Create an open milestone.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: MilestoneId::new(),
            title: title.into(),
            completed: false,
        }
    }
}
