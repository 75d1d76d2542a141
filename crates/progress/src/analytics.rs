//! Rolling-window statistics.

use std::str::FromStr;

use cadence_core::{
    trailing_dates, EngineError, Goal, GoalId, Habit, HabitId, HabitState, Task, Time, TrackingType,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::logbook::{LogBook, StateCounts};
use crate::recurrence::Schedulable;
use crate::time_status::{GoalStatus, TimeStatusCalculator};

/// Trailing window lengths offered for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// 7 days
    #[default]
    Week,
    /// 30 days
    Month,
    /// 90 days
    Quarter,
}

impl Window {
    /// Length in days.
    pub fn days(&self) -> u32 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
        }
    }
}

impl FromStr for Window {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "7" | "week" => Ok(Self::Week),
            "30" | "month" => Ok(Self::Month),
            "90" | "quarter" => Ok(Self::Quarter),
            other => Err(EngineError::InvalidUpdate {
                field: "window",
                reason: format!("expected 7, 30 or 90, got '{}'", other),
            }),
        }
    }
}

/// Counts for one calendar day across all habits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    /// Day
    pub date: NaiveDate,
    /// Logged states
    #[serde(flatten)]
    pub counts: StateCounts,
    /// Habits due that day
    pub due: u32,
}

/// A habit's state on one day; `None` when nothing was logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayState {
    /// Day
    pub date: NaiveDate,
    /// Logged state
    pub state: Option<HabitState>,
}

/// Per-habit breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStats {
    /// Habit
    pub habit_id: HabitId,
    /// Habit name
    pub name: String,
    /// Category key
    pub category: String,
    /// Completion rate over the report window
    pub completion_rate: u32,
    /// Completion rate over the last 7 days
    pub completion_7_days: u32,
    /// Completion rate over the last 30 days
    pub completion_30_days: u32,
    /// Stored current streak
    pub current_streak: u32,
    /// Stored best streak
    pub best_streak: u32,
    /// Logged states over the report window
    #[serde(flatten)]
    pub counts: StateCounts,
    /// Consistency over the report window
    pub consistency_score: u32,
    /// Last 7 days, oldest first
    pub last_7_days: Vec<DayState>,
}

/// Statistics for a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Window length in days
    pub window_days: u32,
    /// First day of the window
    pub start: NaiveDate,
    /// Last day of the window
    pub end: NaiveDate,
    /// One entry per day, oldest first
    pub daily: Vec<DailyStats>,
    /// Logged states in the window across all habits
    pub totals: StateCounts,
    /// `round(100 * done / window_days)`, capped at 100
    pub completion_rate: u32,
    /// `round(100 * done / (done + missed))`, 100 without evidence
    pub consistency_score: u32,
    /// Per-habit breakdown
    pub habits: Vec<HabitStats>,
}

/// Headline numbers for a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    /// All habits
    pub total_habits: u32,
    /// Habits not archived
    pub active_habits: u32,
    /// Sum of current streaks
    pub total_current_streak: u32,
    /// Highest best streak of any habit
    pub best_streak: u32,
    /// Goals not completed
    pub active_goals: u32,
    /// Goals completed
    pub completed_goals: u32,
    /// Mean progress of active goals, rounded
    pub average_goal_progress: u32,
    /// Tasks scheduled today
    pub tasks_due_today: u32,
    /// Tasks counted complete today
    pub tasks_completed_today: u32,
}

/// Progress and deadline figures for one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSummary {
    /// Goal
    pub goal_id: GoalId,
    /// Title
    pub title: String,
    /// Progress percentage
    pub progress: f64,
    /// Calendar days to the target date
    pub days_remaining: i64,
    /// Target date has passed
    pub is_overdue: bool,
    /// Status with tolerance band
    pub status: GoalStatus,
    /// How progress is measured
    pub tracking_type: TrackingType,
    /// Progress ramp from creation to today, at most 31 points
    pub progress_history: Vec<ProgressPoint>,
}

/// One point of a goal's progress chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    /// Day
    pub date: NaiveDate,
    /// Percentage shown for that day
    pub value: u32,
}

/// Sum of habit streaks on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPoint {
    /// Day
    pub date: NaiveDate,
    /// Combined streak across active habits
    pub streak: u32,
}

/// Tasks completed on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTrendPoint {
    /// Day
    pub date: NaiveDate,
    /// Tasks with this day among their completed dates
    pub completed: u32,
}

/// Rolls log history up into window statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsAggregator;

impl AnalyticsAggregator {
    /// Create an analytics aggregator.
    pub fn new() -> Self {
        Self
    }

    /// Statistics for the `window_days` days ending on `today`.
    pub fn compute(&self, habits: &[Habit], logs: &LogBook<'_>, window_days: u32, today: NaiveDate) -> AnalyticsReport {
        let dates = trailing_dates(today, window_days);

        let daily: Vec<DailyStats> = dates
            .iter()
            .map(|date| DailyStats {
                date: *date,
                counts: logs.counts_on(*date),
                due: habits.iter().filter(|h| h.is_due_on(*date)).count() as u32,
            })
            .collect();

        let mut totals = StateCounts::default();
        for day in &daily {
            totals += day.counts;
        }

        AnalyticsReport {
            window_days,
            start: dates.first().copied().unwrap_or(today),
            end: today,
            daily,
            totals,
            completion_rate: totals.completion_rate(window_days),
            consistency_score: totals.consistency_score(),
            habits: habits
                .iter()
                .map(|h| self.habit_stats(h, logs, window_days, today))
                .collect(),
        }
    }

    /// Breakdown for one habit. Streaks are read from the habit, not
    /// recomputed.
    pub fn habit_stats(&self, habit: &Habit, logs: &LogBook<'_>, window_days: u32, today: NaiveDate) -> HabitStats {
        let window = trailing_dates(today, window_days);
        let week = trailing_dates(today, 7);
        let month = trailing_dates(today, 30);
        let counts = logs.counts_for(habit.id, &window);

        HabitStats {
            habit_id: habit.id,
            name: habit.name.clone(),
            category: habit.category.clone(),
            completion_rate: counts.completion_rate(window_days),
            completion_7_days: logs.counts_for(habit.id, &week).completion_rate(7),
            completion_30_days: logs.counts_for(habit.id, &month).completion_rate(30),
            current_streak: habit.current_streak,
            best_streak: habit.best_streak,
            counts,
            consistency_score: counts.consistency_score(),
            last_7_days: week
                .into_iter()
                .map(|date| DayState {
                    date,
                    state: match logs.state_on(habit.id, date) {
                        HabitState::Pending => None,
                        state => Some(state),
                    },
                })
                .collect(),
        }
    }

    /// Headline numbers. `progress` yields each goal's percentage.
    pub fn overview<F>(&self, habits: &[Habit], goals: &[Goal], tasks: &[Task], today: NaiveDate, progress: F) -> Overview
    where
        F: Fn(&Goal) -> f64,
    {
        let active: Vec<f64> = goals.iter().filter(|g| !g.completed).map(&progress).collect();
        let average_goal_progress = if active.is_empty() {
            0
        } else {
            (active.iter().sum::<f64>() / active.len() as f64).round() as u32
        };

        Overview {
            total_habits: habits.len() as u32,
            active_habits: habits.iter().filter(|h| !h.archived).count() as u32,
            total_current_streak: habits.iter().map(|h| h.current_streak).sum(),
            best_streak: habits.iter().map(|h| h.best_streak).max().unwrap_or(0),
            active_goals: active.len() as u32,
            completed_goals: goals.iter().filter(|g| g.completed).count() as u32,
            average_goal_progress,
            tasks_due_today: tasks.iter().filter(|t| t.is_due_on(today)).count() as u32,
            tasks_completed_today: tasks.iter().filter(|t| t.is_completed_on(today)).count() as u32,
        }
    }

    /// Completed recurring tasks per day over the window, oldest first.
    pub fn task_completion_trend(&self, tasks: &[Task], window_days: u32, today: NaiveDate) -> Vec<TaskTrendPoint> {
        trailing_dates(today, window_days)
            .into_iter()
            .map(|date| TaskTrendPoint {
                date,
                completed: tasks.iter().filter(|t| t.completed_dates.contains(&date)).count() as u32,
            })
            .collect()
    }

    /// Combined streak per day over the window, oldest first.
    ///
    /// Each active habit adds its done days up to that date, capped at its
    /// current streak, so the series climbs to today's total.
    pub fn streak_history(&self, habits: &[Habit], logs: &LogBook<'_>, window_days: u32, today: NaiveDate) -> Vec<StreakPoint> {
        let active: Vec<&Habit> = habits.iter().filter(|h| !h.archived).collect();
        let ceiling: u32 = active.iter().map(|h| h.current_streak).sum();

        trailing_dates(today, window_days)
            .into_iter()
            .map(|date| {
                let streak: u32 = active
                    .iter()
                    .map(|h| {
                        let done = logs
                            .logs_for_habit(h.id)
                            .filter(|l| l.date <= date && l.state == HabitState::Done)
                            .count() as u32;
                        done.min(h.current_streak)
                    })
                    .sum();
                StreakPoint {
                    date,
                    streak: streak.min(ceiling),
                }
            })
            .collect()
    }

    /// A linear ramp from 0 on the creation day to `progress` today, over at
    /// most the last 30 days.
    pub fn progress_history(&self, goal: &Goal, progress: f64, today: NaiveDate) -> Vec<ProgressPoint> {
        let span = (today - goal.created_at.date_naive()).num_days().clamp(0, 30);
        (0..=span)
            .map(|i| ProgressPoint {
                date: today - Duration::days(span - i),
                value: (i as f64 / span.max(1) as f64 * progress).round().max(0.0) as u32,
            })
            .collect()
    }

    /// Per-goal progress and deadline figures.
    pub fn goal_summaries<F>(&self, goals: &[Goal], calculator: &TimeStatusCalculator, now: Time, progress: F) -> Vec<GoalSummary>
    where
        F: Fn(&Goal) -> f64,
    {
        goals
            .iter()
            .map(|goal| {
                let pct = progress(goal);
                let status = calculator.status(goal, pct, now);
                GoalSummary {
                    goal_id: goal.id,
                    title: goal.title.clone(),
                    progress: pct,
                    days_remaining: status.days_remaining,
                    is_overdue: status.is_overdue,
                    status: status.status,
                    tracking_type: goal.tracking_type,
                    progress_history: self.progress_history(goal, pct, now.date_naive()),
                }
            })
            .collect()
    }
}
