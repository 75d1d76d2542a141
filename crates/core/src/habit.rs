//! Habit model - recurring commitments and their day-level logs.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::id::{GoalId, HabitId, LogId};
use crate::Time;

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A recurring commitment the user wants to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier
    pub id: HabitId,

    /// Display name
    pub name: String,

    /// Category key (preset or custom)
    pub category: String,

    /// Perceived difficulty
    pub difficulty: Difficulty,

    /// Recurrence rule
    pub frequency: Frequency,

    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,

    /// Archived habits are kept but never due
    #[serde(default)]
    pub archived: bool,

    /// Current run of completed days
    #[serde(default)]
    pub current_streak: u32,

    /// Longest run ever reached, never below `current_streak`
    #[serde(default)]
    pub best_streak: u32,

    /// Goal this habit contributes to
    #[serde(default)]
    pub linked_goal_id: Option<GoalId>,

    /// When created
    pub created_at: Time,
}

impl Habit {
    /// Create a new habit with zeroed streak counters.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        difficulty: Difficulty,
        frequency: Frequency,
    ) -> Self {
        Self {
            id: HabitId::new(),
            name: name.into(),
            category: category.into(),
            difficulty,
            frequency,
            notes: None,
            archived: false,
            current_streak: 0,
            best_streak: 0,
            linked_goal_id: None,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Habit difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Easy
    Easy,
    /// Medium
    Medium,
    /// Hard
    Hard,
}

impl FromStr for Difficulty {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(EngineError::invalid_update(
                "difficulty",
                format!("unknown difficulty '{}'", other),
            )),
        }
    }
}

/// Recurrence rule for a habit.
///
/// Weekday indices run Sunday = 0 through Saturday = 6; month days run 1..=31.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Frequency {
    /// Every day
    Daily,

    /// Once a week; `days` are optional preferred weekdays
    Weekly {
        /// Preferred weekdays
        #[serde(default)]
        days: BTreeSet<u8>,
    },

    /// Only on the listed weekdays
    SpecificWeekdays {
        /// Weekday indices
        days: BTreeSet<u8>,
    },

    /// Only on the listed days of the month
    SpecificMonthDays {
        /// Day-of-month numbers
        days: BTreeSet<u8>,
    },
}

impl Frequency {
    /// Check that every day index is in range for the rule.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Daily => Ok(()),
            Self::Weekly { days } | Self::SpecificWeekdays { days } => {
                match days.iter().find(|d| **d > 6) {
                    Some(bad) => Err(EngineError::invalid_update(
                        "frequency",
                        format!("weekday {} is outside 0..=6", bad),
                    )),
                    None => Ok(()),
                }
            }
            Self::SpecificMonthDays { days } => {
                match days.iter().find(|d| **d == 0 || **d > 31) {
                    Some(bad) => Err(EngineError::invalid_update(
                        "frequency",
                        format!("month day {} is outside 1..=31", bad),
                    )),
                    None => Ok(()),
                }
            }
        }
    }

    /// Human-readable label, e.g. "Daily" or "Mon, Wed".
    pub fn label(&self) -> String {
        match self {
            Self::Daily => "Daily".to_string(),
            Self::Weekly { .. } => "Weekly".to_string(),
            Self::SpecificWeekdays { days } if !days.is_empty() => days
                .iter()
                .filter_map(|d| WEEKDAY_NAMES.get(*d as usize).copied())
                .collect::<Vec<_>>()
                .join(", "),
            Self::SpecificWeekdays { .. } => "Specific days".to_string(),
            Self::SpecificMonthDays { days } if !days.is_empty() => days
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            Self::SpecificMonthDays { .. } => "Monthly".to_string(),
        }
    }
}

/// State of a habit on a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitState {
    /// Completed
    Done,
    /// Deliberately skipped; neither extends nor breaks a streak
    Skipped,
    /// Not done; breaks the streak
    Missed,
    /// No log row exists for the day
    Pending,
}

impl HabitState {
    /// Lowercase name used in storage and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Skipped => "skipped",
            Self::Missed => "missed",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for HabitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for HabitState {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "done" => Ok(Self::Done),
            "skipped" | "skip" => Ok(Self::Skipped),
            "missed" | "miss" => Ok(Self::Missed),
            "pending" => Ok(Self::Pending),
            other => Err(EngineError::invalid_update(
                "state",
                format!("unknown habit state '{}'", other),
            )),
        }
    }
}

/// One logged day for one habit. `(habit_id, date)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitLog {
    /// Unique identifier
    pub id: LogId,

    /// Habit this log belongs to
    pub habit_id: HabitId,

    /// Calendar day
    pub date: NaiveDate,

    /// Recorded state
    pub state: HabitState,
}

impl HabitLog {
    /// Create a new log row.
    pub fn new(habit_id: HabitId, date: NaiveDate, state: HabitState) -> Self {
        Self {
            id: LogId::new(),
            habit_id,
            date,
            state,
        }
    }
}
