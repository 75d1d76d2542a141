//! Recurrence & progress engine.
//!
//! Pure calculations over habit, goal and task snapshots: what is due on a
//! day, streak transitions, goal progress, deadline status and window
//! statistics. [`ProgressTracker`] wires them to a storage backend.

#![warn(missing_docs)]

pub mod config;
pub mod error;

// Engine
pub mod recurrence;
pub mod logbook;
pub mod streak;
pub mod time_status;
pub mod aggregator;
pub mod analytics;
pub mod listing;

// Service
pub mod tracker;

pub use config::EngineConfig;
pub use error::{Result, TrackerError};

pub use recurrence::{expected_occurrences, is_due, Schedulable};
pub use logbook::{LogBook, StateCounts};
pub use streak::{LogOutcome, LoggedDay, StreakCheck, StreakCounters, StreakEngine};
pub use time_status::{GoalStatus, TimeStatus, TimeStatusCalculator};
pub use aggregator::{calculate_milestone_progress, ProgressAggregator, ProgressReport};
pub use analytics::{
    AnalyticsAggregator, AnalyticsReport, DailyStats, DayState, GoalSummary, HabitStats, Overview,
    ProgressPoint, StreakPoint, TaskTrendPoint, Window,
};
pub use listing::{filter_by_category, sort_habits, sort_tasks_by_completion, Categorized, HabitSort};
pub use tracker::{DueHabit, DueItems, DueTask, ProgressTracker};
