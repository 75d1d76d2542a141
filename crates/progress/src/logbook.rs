//! Indexed read-only view over a habit-log snapshot.

use std::collections::HashMap;

use cadence_core::{HabitId, HabitLog, HabitState};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Done/skipped/missed tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    /// Days logged done
    pub done: u32,
    /// Days logged skipped
    pub skipped: u32,
    /// Days logged missed
    pub missed: u32,
}

impl StateCounts {
    /// Count one state. `Pending` is not a logged state and is ignored.
    pub fn record(&mut self, state: HabitState) {
        match state {
            HabitState::Done => self.done += 1,
            HabitState::Skipped => self.skipped += 1,
            HabitState::Missed => self.missed += 1,
            HabitState::Pending => {}
        }
    }

    /// All logged days.
    pub fn total(&self) -> u32 {
        self.done + self.skipped + self.missed
    }

    /// `round(100 * done / days)`, capped at 100; 0 for an empty window.
    ///
    /// Days without a log count as zero completions.
    pub fn completion_rate(&self, days: u32) -> u32 {
        if days == 0 {
            return 0;
        }
        percent(self.done, days).min(100)
    }

    /// `round(100 * done / (done + missed))`; skips are neutral.
    ///
    /// With no done or missed days there is no evidence of failure, so the
    /// score is 100.
    pub fn consistency_score(&self) -> u32 {
        let denominator = self.done + self.missed;
        if denominator == 0 {
            return 100;
        }
        percent(self.done, denominator)
    }
}

impl std::ops::AddAssign for StateCounts {
    fn add_assign(&mut self, other: Self) {
        self.done += other.done;
        self.skipped += other.skipped;
        self.missed += other.missed;
    }
}

fn percent(part: u32, whole: u32) -> u32 {
    (100.0 * part as f64 / whole as f64).round() as u32
}

/// Logs keyed by `(habit, date)`.
///
/// Dates without a row read as [`HabitState::Pending`].
#[derive(Debug, Clone)]
pub struct LogBook<'a> {
    logs: &'a [HabitLog],
    by_day: HashMap<(HabitId, NaiveDate), &'a HabitLog>,
}

impl<'a> LogBook<'a> {
    /// Index a snapshot. If a snapshot holds two rows for one habit and day,
    /// the later one wins.
    pub fn new(logs: &'a [HabitLog]) -> Self {
        let by_day = logs.iter().map(|l| ((l.habit_id, l.date), l)).collect();
        Self { logs, by_day }
    }

    /// The row for a habit on a day.
    pub fn get(&self, habit_id: HabitId, date: NaiveDate) -> Option<&'a HabitLog> {
        self.by_day.get(&(habit_id, date)).copied()
    }

    /// State for a habit on a day, `Pending` when nothing is logged.
    pub fn state_on(&self, habit_id: HabitId, date: NaiveDate) -> HabitState {
        self.get(habit_id, date).map(|l| l.state).unwrap_or(HabitState::Pending)
    }

    /// Every row for one habit, one per day.
    pub fn logs_for_habit(&self, habit_id: HabitId) -> impl Iterator<Item = &'a HabitLog> + '_ {
        self.rows().filter(move |l| l.habit_id == habit_id)
    }

    /// Every row on one day, one per habit.
    pub fn logs_for_date(&self, date: NaiveDate) -> impl Iterator<Item = &'a HabitLog> + '_ {
        self.rows().filter(move |l| l.date == date)
    }

    /// Snapshot rows in order, skipping any row shadowed by a later one for
    /// the same habit and day.
    fn rows(&self) -> impl Iterator<Item = &'a HabitLog> + '_ {
        self.logs
            .iter()
            .filter(move |l| self.get(l.habit_id, l.date).is_some_and(|kept| std::ptr::eq(kept, *l)))
    }

    /// Rows for one habit with `start <= date <= end`.
    pub fn logs_in_range(&self, habit_id: HabitId, start: NaiveDate, end: NaiveDate) -> Vec<&'a HabitLog> {
        self.logs_for_habit(habit_id)
            .filter(|l| l.date >= start && l.date <= end)
            .collect()
    }

    /// Tallies for one habit over the given days.
    pub fn counts_for(&self, habit_id: HabitId, dates: &[NaiveDate]) -> StateCounts {
        let mut counts = StateCounts::default();
        for date in dates {
            counts.record(self.state_on(habit_id, *date));
        }
        counts
    }

    /// Tallies across all habits for one day.
    pub fn counts_on(&self, date: NaiveDate) -> StateCounts {
        let mut counts = StateCounts::default();
        for log in self.logs_for_date(date) {
            counts.record(log.state);
        }
        counts
    }
}
