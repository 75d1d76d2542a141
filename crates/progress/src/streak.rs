//! Streak state machine.
//!
//! Each logging event moves one habit-day from its previous state to a new
//! one and adjusts the habit's `(current, best)` counters:
//!
//! ```text
//! pending ──► done | skipped | missed
//! done ◄──► skipped ◄──► missed        (done ─► done is a no-op)
//! ```
//!
//! - into `done` (from anything but `done`): current += 1, best = max(best, current)
//! - into `missed`: current = 0
//! - into `skipped`: unchanged
//!
//! A lost streak is not restored by rewriting `missed` to `skipped`; only a
//! fresh `done` moves the counter again.

use cadence_core::{EngineError, Habit, HabitId, HabitLog, HabitState, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::logbook::LogBook;

/// A habit's streak counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakCounters {
    /// Current run
    pub current: u32,
    /// Best run ever
    pub best: u32,
}

impl StreakCounters {
    /// Counters stored on a habit.
    pub fn of(habit: &Habit) -> Self {
        Self {
            current: habit.current_streak,
            best: habit.best_streak,
        }
    }
}

/// Result of a logging event.
#[derive(Debug, Clone, PartialEq)]
pub enum LogOutcome {
    /// The day was recorded; the caller persists `log` and, if the streak
    /// changed, the habit.
    Recorded(LoggedDay),
    /// The day was already done. Nothing changes; report it as a notice.
    AlreadyCompleted,
}

/// A recorded transition.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedDay {
    /// Row to persist; keeps the id of an overwritten row
    pub log: HabitLog,
    /// State the day had before this event
    pub previous_state: HabitState,
    /// Counters before the event
    pub before: StreakCounters,
    /// Counters after the event
    pub after: StreakCounters,
}

impl LoggedDay {
    /// Whether the habit's counters need to be written back.
    pub fn streak_changed(&self) -> bool {
        self.before != self.after
    }
}

/// Stored streak compared against the log history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakCheck {
    /// `current_streak` stored on the habit
    pub stored: u32,
    /// Consecutive done days found in the logs
    pub observed: u32,
}

impl StreakCheck {
    /// Whether the stored counter agrees with the logs.
    pub fn is_consistent(&self) -> bool {
        self.stored == self.observed
    }
}

/// Streak state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreakEngine;

impl StreakEngine {
    /// Create a streak engine.
    pub fn new() -> Self {
        Self
    }

    /// Counters after moving a day from `previous` to `next`.
    ///
    /// Returns `Ok(None)` for the `done -> done` no-op.
    pub fn transition(
        &self,
        previous: HabitState,
        next: HabitState,
        counters: StreakCounters,
    ) -> Result<Option<StreakCounters>> {
        match (previous, next) {
            (_, HabitState::Pending) => Err(EngineError::InvalidTransition {
                from: previous,
                to: next,
            }),
            (HabitState::Done, HabitState::Done) => Ok(None),
            (_, HabitState::Done) => {
                let current = counters.current.saturating_add(1);
                Ok(Some(StreakCounters {
                    current,
                    best: counters.best.max(current),
                }))
            }
            (_, HabitState::Missed) => Ok(Some(StreakCounters {
                current: 0,
                best: counters.best,
            })),
            (_, HabitState::Skipped) => Ok(Some(counters)),
        }
    }

    /// Log `state` for `habit` on `date`, given the row already stored for
    /// that day (if any).
    pub fn log(
        &self,
        habit: &Habit,
        existing: Option<&HabitLog>,
        date: NaiveDate,
        state: HabitState,
    ) -> Result<LogOutcome> {
        let previous_state = existing.map(|l| l.state).unwrap_or(HabitState::Pending);
        let before = StreakCounters::of(habit);

        let Some(after) = self.transition(previous_state, state, before)? else {
            trace!(habit = %habit.id, %date, "day already done");
            return Ok(LogOutcome::AlreadyCompleted);
        };

        let log = match existing {
            Some(row) => HabitLog { state, ..row.clone() },
            None => HabitLog::new(habit.id, date, state),
        };
        trace!(habit = %habit.id, %date, from = %previous_state, to = %state, current = after.current, "logged day");

        Ok(LogOutcome::Recorded(LoggedDay {
            log,
            previous_state,
            before,
            after,
        }))
    }

    /// Write the new counters onto the habit.
    pub fn apply(&self, habit: &mut Habit, day: &LoggedDay) {
        habit.current_streak = day.after.current;
        habit.best_streak = day.after.best;
    }

    /// Consecutive done days ending at or just before `as_of`.
    ///
    /// Walks done rows backwards from `as_of`, counting while each row is 0
    /// or 1 days before the previous one, and stops at the first larger gap.
    pub fn consecutive_done_run(&self, logs: &LogBook<'_>, habit_id: HabitId, as_of: NaiveDate) -> u32 {
        let mut done: Vec<NaiveDate> = logs
            .logs_for_habit(habit_id)
            .filter(|l| l.state == HabitState::Done && l.date <= as_of)
            .map(|l| l.date)
            .collect();
        done.sort_unstable_by(|a, b| b.cmp(a));

        let mut count = 0;
        let mut expected = as_of;
        for date in done {
            let gap = (expected - date).num_days();
            if gap > 1 {
                break;
            }
            count += 1;
            expected = date;
        }
        count
    }

    /// Compare the stored streak with the log history.
    pub fn verify(&self, habit: &Habit, logs: &LogBook<'_>, as_of: NaiveDate) -> StreakCheck {
        StreakCheck {
            stored: habit.current_streak,
            observed: self.consecutive_done_run(logs, habit.id, as_of),
        }
    }
}
