//! Cadence core data models.
//!
//! This crate defines the entities the recurrence and progress engine works
//! on: habits and their day logs, goals with milestones, and tasks, plus the
//! typed edits and errors shared by every layer.

#![warn(missing_docs)]

// Core identities
mod id;
mod date;
mod error;

// Commitments
mod habit;
mod goal;
mod task;

// Edits
mod update;

// Re-exports
pub use id::*;
pub use date::{format_date, parse_date, trailing_dates, weekday_index, window_start, DATE_FORMAT};
pub use error::{EngineError, Result};

pub use habit::{Habit, HabitLog, HabitState, Difficulty, Frequency};
pub use goal::{Goal, Milestone, TrackingType};
pub use task::{Task, TaskKind};
pub use update::{HabitUpdate, GoalUpdate, TaskUpdate};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
