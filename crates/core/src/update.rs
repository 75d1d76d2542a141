//! Tagged edits for habits, goals and tasks.
//!
//! Each variant changes exactly one concern and is validated before it is
//! applied. Streak counters are not reachable from here; only the streak
//! engine moves them.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::goal::{Goal, Milestone, TrackingType};
use crate::habit::{Difficulty, Frequency, Habit};
use crate::id::{GoalId, MilestoneId};
use crate::task::{Task, TaskKind};

fn non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EngineError::invalid_update(field, "must not be empty"));
    }
    Ok(())
}

fn positive_target(value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EngineError::invalid_update(
            "target_value",
            format!("{} is not a positive number", value),
        ));
    }
    Ok(())
}

/// An edit to a habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum HabitUpdate {
    /// Rename
    Name(String),
    /// Change category
    Category(String),
    /// Change difficulty
    Difficulty(Difficulty),
    /// Replace the recurrence rule
    Frequency(Frequency),
    /// Replace or clear notes
    Notes(Option<String>),
    /// Archive (`true`) or restore (`false`)
    Archived(bool),
    /// Link to or unlink from a goal
    LinkedGoal(Option<GoalId>),
}

impl HabitUpdate {
    /// Check the update without applying it.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Name(name) => non_empty("name", name),
            Self::Category(category) => non_empty("category", category),
            Self::Frequency(rule) => rule.validate(),
            Self::Difficulty(_) | Self::Notes(_) | Self::Archived(_) | Self::LinkedGoal(_) => Ok(()),
        }
    }

    /// Validate and apply to `habit`.
    pub fn apply(self, habit: &mut Habit) -> Result<()> {
        self.validate()?;
        match self {
            Self::Name(name) => habit.name = name,
            Self::Category(category) => habit.category = category,
            Self::Difficulty(difficulty) => habit.difficulty = difficulty,
            Self::Frequency(rule) => habit.frequency = rule,
            Self::Notes(notes) => habit.notes = notes,
            Self::Archived(archived) => habit.archived = archived,
            Self::LinkedGoal(goal) => habit.linked_goal_id = goal,
        }
        Ok(())
    }

    /// Whether the edit can change auto-tracked goal progress.
    pub fn affects_progress(&self) -> bool {
        matches!(self, Self::Frequency(_) | Self::Archived(_))
    }
}

/// An edit to a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum GoalUpdate {
    /// Rename
    Title(String),
    /// Replace or clear the motivation text
    Why(Option<String>),
    /// Move the target date
    TargetDate(NaiveDate),
    /// Switch tracking type; numeric needs a target
    Tracking {
        /// New tracking type
        tracking_type: TrackingType,
        /// Target for numeric tracking
        target_value: Option<f64>,
    },
    /// Change the numeric target
    TargetValue(f64),
    /// Append a milestone
    AddMilestone(String),
    /// Remove a milestone
    RemoveMilestone(MilestoneId),
    /// Tick or untick a milestone
    SetMilestone {
        /// Milestone to change
        id: MilestoneId,
        /// New completion flag
        completed: bool,
    },
    /// Enable or disable auto-tracking
    AutoTrack(bool),
    /// Mark complete or reopen
    Completed(bool),
    /// Replace or clear the category
    Category(Option<String>),
}

impl GoalUpdate {
    /// Check the update against the current goal without applying it.
    pub fn validate(&self, goal: &Goal) -> Result<()> {
        match self {
            Self::Title(title) => non_empty("title", title),
            Self::AddMilestone(title) => non_empty("milestone", title),
            Self::Tracking { tracking_type: TrackingType::Numeric, target_value } => {
                match target_value.or(goal.target_value) {
                    Some(value) => positive_target(value),
                    None => Err(EngineError::invalid_update(
                        "target_value",
                        "numeric tracking needs a target value",
                    )),
                }
            }
            Self::Tracking { target_value: Some(value), .. } | Self::TargetValue(value) => {
                positive_target(*value)
            }
            Self::RemoveMilestone(id) | Self::SetMilestone { id, .. } => {
                if goal.milestones.iter().any(|m| m.id == *id) {
                    Ok(())
                } else {
                    Err(EngineError::invalid_update(
                        "milestone",
                        format!("no milestone {} on goal {}", id, goal.id),
                    ))
                }
            }
            Self::Why(_)
            | Self::TargetDate(_)
            | Self::Tracking { .. }
            | Self::AutoTrack(_)
            | Self::Completed(_)
            | Self::Category(_) => Ok(()),
        }
    }

    /// Validate and apply to `goal`.
    pub fn apply(self, goal: &mut Goal) -> Result<()> {
        self.validate(goal)?;
        match self {
            Self::Title(title) => goal.title = title,
            Self::Why(why) => goal.why = why,
            Self::TargetDate(date) => goal.target_date = date,
            Self::Tracking { tracking_type, target_value } => {
                goal.tracking_type = tracking_type;
                if target_value.is_some() {
                    goal.target_value = target_value;
                }
            }
            Self::TargetValue(value) => goal.target_value = Some(value),
            Self::AddMilestone(title) => goal.milestones.push(Milestone::new(title)),
            Self::RemoveMilestone(id) => goal.milestones.retain(|m| m.id != id),
            Self::SetMilestone { id, completed } => {
                if let Some(milestone) = goal.milestones.iter_mut().find(|m| m.id == id) {
                    milestone.completed = completed;
                }
            }
            Self::AutoTrack(enabled) => goal.auto_track = enabled,
            Self::Completed(completed) => goal.completed = completed,
            Self::Category(category) => goal.category = category,
        }
        Ok(())
    }

    /// Whether the edit can change auto-tracked progress.
    pub fn affects_progress(&self) -> bool {
        matches!(
            self,
            Self::Tracking { .. } | Self::TargetValue(_) | Self::AutoTrack(true)
        )
    }
}

/// An edit to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum TaskUpdate {
    /// Rename
    Title(String),
    /// Change recurrence kind
    Kind(TaskKind),
    /// Replace the day-of-month set
    MonthDays(BTreeSet<u8>),
    /// Replace the explicit date list
    Dates(BTreeSet<NaiveDate>),
    /// Replace or clear the category
    Category(Option<String>),
    /// Link to or unlink from a goal
    LinkedGoal(Option<GoalId>),
}

impl TaskUpdate {
    /// Check the update without applying it.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Title(title) => non_empty("title", title),
            Self::MonthDays(days) => match days.iter().find(|d| **d == 0 || **d > 31) {
                Some(bad) => Err(EngineError::invalid_update(
                    "month_days",
                    format!("month day {} is outside 1..=31", bad),
                )),
                None => Ok(()),
            },
            Self::Kind(_) | Self::Dates(_) | Self::Category(_) | Self::LinkedGoal(_) => Ok(()),
        }
    }

    /// Validate and apply to `task`.
    pub fn apply(self, task: &mut Task) -> Result<()> {
        self.validate()?;
        match self {
            Self::Title(title) => task.title = title,
            Self::Kind(kind) => task.kind = kind,
            Self::MonthDays(days) => task.month_days = days,
            Self::Dates(dates) => task.dates = dates,
            Self::Category(category) => task.category = category,
            Self::LinkedGoal(goal) => task.linked_goal_id = goal,
        }
        Ok(())
    }

    /// Whether the edit can change auto-tracked goal progress.
    pub fn affects_progress(&self) -> bool {
        matches!(self, Self::Kind(_))
    }
}
