//! Time-based goal status.

use std::cmp::Ordering;

use cadence_core::{Goal, Time};
use chrono::{NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Where a goal stands against its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalStatus {
    /// Progress keeps pace with elapsed time
    OnTrack,
    /// Elapsed time leads progress by more than the tolerance
    Behind,
    /// Target date has passed
    Overdue,
    /// Marked complete
    Completed,
}

impl GoalStatus {
    /// Kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "on-track",
            Self::Behind => "behind",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Derived deadline figures for one goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeStatus {
    /// Calendar days until the target date; negative once it has passed
    pub days_remaining: i64,
    /// `days_remaining < 0`
    pub is_overdue: bool,
    /// Share of the created-to-target span already elapsed, 0..=100
    pub time_progress: f64,
    /// Tolerance-banded status
    pub status: GoalStatus,
    /// Strict comparison of time progress against goal progress
    pub is_behind_schedule: bool,
}

/// Computes [`TimeStatus`] for goals.
#[derive(Debug, Clone, Copy)]
pub struct TimeStatusCalculator {
    behind_tolerance: f64,
}

impl Default for TimeStatusCalculator {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl TimeStatusCalculator {
    /// Create a calculator with the given behind-schedule tolerance in points.
    pub fn new(behind_tolerance: f64) -> Self {
        Self { behind_tolerance }
    }

    /// Calendar days from `now` to the target date.
    pub fn days_remaining(&self, goal: &Goal, now: Time) -> i64 {
        (goal.target_date - now.date_naive()).num_days()
    }

    /// Elapsed share of the goal's time span, clamped to 0..=100.
    ///
    /// The target date counts from 00:00 UTC. A span that is empty or
    /// negative is treated as fully elapsed.
    pub fn time_progress(&self, goal: &Goal, now: Time) -> f64 {
        let target = Utc.from_utc_datetime(&goal.target_date.and_time(NaiveTime::MIN));
        let total = (target - goal.created_at).num_milliseconds();
        if total <= 0 {
            return 100.0;
        }
        let elapsed = (now - goal.created_at).num_milliseconds();
        (elapsed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Strict predicate: any lead of time over progress counts.
    ///
    /// Distinct from [`GoalStatus::Behind`], which allows the tolerance band.
    pub fn is_behind_schedule(&self, goal: &Goal, progress_pct: f64, now: Time) -> bool {
        self.time_progress(goal, now) > progress_pct
    }

    /// Full status for a goal whose progress percentage is `progress_pct`.
    pub fn status(&self, goal: &Goal, progress_pct: f64, now: Time) -> TimeStatus {
        let days_remaining = self.days_remaining(goal, now);
        let is_overdue = days_remaining < 0;
        let time_progress = self.time_progress(goal, now);

        let status = if goal.completed {
            GoalStatus::Completed
        } else if is_overdue {
            GoalStatus::Overdue
        } else if time_progress > progress_pct + self.behind_tolerance {
            GoalStatus::Behind
        } else {
            GoalStatus::OnTrack
        };

        TimeStatus {
            days_remaining,
            is_overdue,
            time_progress,
            status,
            is_behind_schedule: time_progress > progress_pct,
        }
    }

    /// Order goals by urgency: overdue first, then behind schedule, then by
    /// fewest days remaining.
    pub fn sort_by_urgency<F>(&self, goals: &mut [Goal], now: Time, progress: F)
    where
        F: Fn(&Goal) -> f64,
    {
        goals.sort_by_cached_key(|goal| {
            let s = self.status(goal, progress(goal), now);
            (!s.is_overdue, !s.is_behind_schedule, s.days_remaining)
        });
    }

    /// The goal to surface first: among open goals, overdue first, then
    /// nearest deadline, then least progress.
    pub fn primary_goal<'a, F>(&self, goals: &'a [Goal], now: Time, progress: F) -> Option<&'a Goal>
    where
        F: Fn(&Goal) -> f64,
    {
        goals
            .iter()
            .filter(|g| !g.completed)
            .map(|g| (g, self.days_remaining(g, now), progress(g)))
            .min_by(|(_, a_days, a_pct), (_, b_days, b_pct)| {
                (*a_days >= 0)
                    .cmp(&(*b_days >= 0))
                    .then(a_days.cmp(b_days))
                    .then(a_pct.partial_cmp(b_pct).unwrap_or(Ordering::Equal))
            })
            .map(|(g, _, _)| g)
    }
}
