//! Goal progress aggregation.

use cadence_core::{
    window_start, EngineError, Goal, Habit, HabitState, Milestone, Result, Task, TrackingType,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logbook::LogBook;
use crate::recurrence::expected_occurrences;

/// Stored values closer than this are treated as unchanged.
const EPSILON: f64 = 1e-9;

/// A goal's progress normalized for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// 0..=100
    pub percentage: f64,
    /// Progress in the goal's own unit
    pub current: f64,
    /// Target in the goal's own unit
    pub target: f64,
    /// Short human-readable summary
    pub label: String,
}

/// `round(100 * completed / total)`, or 0 for an empty checklist.
pub fn calculate_milestone_progress(milestones: &[Milestone]) -> f64 {
    if milestones.is_empty() {
        return 0.0;
    }
    let completed = milestones.iter().filter(|m| m.completed).count();
    (100.0 * completed as f64 / milestones.len() as f64).round()
}

/// Computes goal progress from tracking data or linked commitments.
#[derive(Debug, Clone, Copy)]
pub struct ProgressAggregator {
    lookback_days: u32,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new(30)
    }
}

impl ProgressAggregator {
    /// Create an aggregator looking back over `lookback_days` for habit
    /// contributions.
    pub fn new(lookback_days: u32) -> Self {
        Self { lookback_days }
    }

    /// Progress derived from the goal's own fields.
    pub fn progress(&self, goal: &Goal) -> ProgressReport {
        match (goal.tracking_type, numeric_target(goal)) {
            (TrackingType::Checklist, _) => {
                let total = goal.milestones.len();
                let completed = goal.completed_milestones();
                ProgressReport {
                    percentage: calculate_milestone_progress(&goal.milestones),
                    current: completed as f64,
                    target: total as f64,
                    label: format!("{}/{} milestones", completed, total),
                }
            }
            (TrackingType::Numeric, Some(target)) => ProgressReport {
                percentage: (100.0 * goal.current_progress / target).round().clamp(0.0, 100.0),
                current: goal.current_progress,
                target,
                label: format!("{}/{}", number(goal.current_progress), number(target)),
            },
            // Percentage goals, and numeric goals that never got a target.
            _ => {
                let value = goal.current_progress.clamp(0.0, 100.0);
                ProgressReport {
                    percentage: value,
                    current: value,
                    target: 100.0,
                    label: format!("{}%", number(value)),
                }
            }
        }
    }

    /// Check a manual progress value before it is stored.
    pub fn validate_progress_update(&self, goal: &Goal, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(EngineError::invalid_progress(value, "value must be a finite number"));
        }
        if goal.auto_track {
            return Err(EngineError::invalid_progress(
                value,
                "progress is tracked automatically from linked habits and tasks",
            ));
        }
        match goal.tracking_type {
            TrackingType::Percentage if !(0.0..=100.0).contains(&value) => Err(
                EngineError::invalid_progress(value, "percentage must be between 0 and 100"),
            ),
            TrackingType::Numeric if value < 0.0 => {
                Err(EngineError::invalid_progress(value, "value cannot be negative"))
            }
            TrackingType::Numeric => match numeric_target(goal) {
                Some(target) if value > target * 2.0 => Err(EngineError::invalid_progress(
                    value,
                    format!("value exceeds twice the target of {}", number(target)),
                )),
                Some(_) => Ok(()),
                None if value > 100.0 => Err(EngineError::invalid_progress(
                    value,
                    "goal has no target, so the value is a percentage between 0 and 100",
                )),
                None => Ok(()),
            },
            TrackingType::Checklist => Err(EngineError::invalid_progress(
                value,
                "checklist progress follows its milestones",
            )),
            TrackingType::Percentage => Ok(()),
        }
    }

    /// Done days over expected occurrences across `habits`, as a rounded
    /// percentage capped at 100.
    ///
    /// Archived habits are ignored. The window is the `lookback_days` days
    /// ending on `today`.
    pub fn habit_contribution(&self, habits: &[&Habit], logs: &LogBook<'_>, today: NaiveDate) -> f64 {
        let start = window_start(today, self.lookback_days);
        let mut done = 0u32;
        let mut expected = 0u32;

        for habit in habits.iter().filter(|h| !h.archived) {
            done += logs
                .logs_in_range(habit.id, start, today)
                .iter()
                .filter(|l| l.state == HabitState::Done)
                .count() as u32;
            expected += expected_occurrences(&habit.frequency, self.lookback_days);
        }

        if expected == 0 {
            return 0.0;
        }
        (100.0 * done as f64 / expected as f64).round().min(100.0)
    }

    /// Share of `tasks` completed, as a rounded percentage.
    ///
    /// One-time tasks count through their flag, recurring ones when `today`
    /// is among their completed dates.
    pub fn task_contribution(&self, tasks: &[&Task], today: NaiveDate) -> f64 {
        if tasks.is_empty() {
            return 0.0;
        }
        let completed = tasks.iter().filter(|t| t.is_completed_on(today)).count();
        (100.0 * completed as f64 / tasks.len() as f64).round()
    }

    /// Percentage derived from the goal's linked habits and tasks.
    ///
    /// `None` when the goal is not auto-tracked, is a checklist, or has no
    /// linked commitment among `habits` and `tasks`; the stored progress
    /// then stands.
    pub fn auto_progress(
        &self,
        goal: &Goal,
        habits: &[Habit],
        tasks: &[Task],
        logs: &LogBook<'_>,
        today: NaiveDate,
    ) -> Option<f64> {
        if !goal.auto_track || goal.tracking_type == TrackingType::Checklist || !goal.has_links() {
            return None;
        }

        let linked_habits: Vec<&Habit> = habits
            .iter()
            .filter(|h| goal.linked_habit_ids.contains(&h.id) && !h.archived)
            .collect();
        let linked_tasks: Vec<&Task> = tasks
            .iter()
            .filter(|t| goal.linked_task_ids.contains(&t.id))
            .collect();

        match (linked_habits.is_empty(), linked_tasks.is_empty()) {
            (true, true) => None,
            (false, true) => Some(self.habit_contribution(&linked_habits, logs, today)),
            (true, false) => Some(self.task_contribution(&linked_tasks, today)),
            (false, false) => {
                let habit = self.habit_contribution(&linked_habits, logs, today);
                let task = self.task_contribution(&linked_tasks, today);
                Some(((habit + task) / 2.0).round())
            }
        }
    }

    /// New `current_progress` for an auto-tracked goal, in the goal's unit.
    ///
    /// Returns `None` when there is nothing to compute or the stored value
    /// already matches, so callers can persist exactly when this is `Some`.
    pub fn recalculate(
        &self,
        goal: &Goal,
        habits: &[Habit],
        tasks: &[Task],
        logs: &LogBook<'_>,
        today: NaiveDate,
    ) -> Option<f64> {
        let pct = self.auto_progress(goal, habits, tasks, logs, today)?;
        let value = stored_value(goal, pct);
        if (value - goal.current_progress).abs() < EPSILON {
            return None;
        }
        debug!(goal = %goal.id, from = goal.current_progress, to = value, "auto progress changed");
        Some(value)
    }

    /// Progress report including any auto-tracked contribution.
    pub fn compute_goal_progress(
        &self,
        goal: &Goal,
        habits: &[Habit],
        tasks: &[Task],
        logs: &LogBook<'_>,
        today: NaiveDate,
    ) -> ProgressReport {
        match self.auto_progress(goal, habits, tasks, logs, today) {
            Some(pct) => {
                let mut report = self.progress(&Goal {
                    current_progress: stored_value(goal, pct),
                    ..goal.clone()
                });
                report.percentage = pct.clamp(0.0, 100.0);
                report
            }
            None => self.progress(goal),
        }
    }
}

/// An auto percentage in the goal's own unit. Numeric values keep their
/// fraction so the percentage reads back unchanged.
fn stored_value(goal: &Goal, pct: f64) -> f64 {
    match numeric_target(goal) {
        Some(target) if goal.tracking_type == TrackingType::Numeric => pct / 100.0 * target,
        _ => pct,
    }
}

fn numeric_target(goal: &Goal) -> Option<f64> {
    goal.target_value.filter(|t| *t > 0.0 && t.is_finite())
}

/// Whole numbers without a fraction, everything else to one decimal.
fn number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{Difficulty, Frequency, HabitLog, TaskKind};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
    }

    fn goal(tracking: TrackingType) -> Goal {
        Goal::new("Goal", NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(), tracking)
    }

    #[test]
    fn test_numeric_progress_clamped() {
        let agg = ProgressAggregator::default();
        let mut g = goal(TrackingType::Numeric);
        g.target_value = Some(20.0);
        g.current_progress = 25.0;
        let report = agg.progress(&g);
        assert_eq!(report.percentage, 100.0);
        assert_eq!(report.label, "25/20");

        g.current_progress = 7.0;
        assert_eq!(agg.progress(&g).percentage, 35.0);
    }

    #[test]
    fn test_checklist_progress() {
        let agg = ProgressAggregator::default();
        let mut g = goal(TrackingType::Checklist);
        assert_eq!(agg.progress(&g).percentage, 0.0);

        g.milestones.push(Milestone { completed: true, ..Milestone::new("draft") });
        g.milestones.push(Milestone::new("publish"));
        let report = agg.progress(&g);
        assert_eq!(report.percentage, 50.0);
        assert_eq!(report.label, "1/2 milestones");
    }

    #[test]
    fn test_milestone_helper_rounds() {
        let milestones = vec![
            Milestone { completed: true, ..Milestone::new("a") },
            Milestone::new("b"),
            Milestone::new("c"),
        ];
        assert_eq!(calculate_milestone_progress(&milestones), 33.0);
        assert_eq!(calculate_milestone_progress(&[]), 0.0);
    }

    #[test]
    fn test_numeric_without_target_reads_as_percentage() {
        let agg = ProgressAggregator::default();
        let mut g = goal(TrackingType::Numeric);
        g.current_progress = 140.0;
        let report = agg.progress(&g);
        assert_eq!(report.percentage, 100.0);
        assert_eq!(report.target, 100.0);
    }

    #[test]
    fn test_validate_progress_update() {
        let agg = ProgressAggregator::default();
        let pct = goal(TrackingType::Percentage);
        assert!(agg.validate_progress_update(&pct, 0.0).is_ok());
        assert!(agg.validate_progress_update(&pct, 100.0).is_ok());
        assert!(agg.validate_progress_update(&pct, 100.5).is_err());
        assert!(agg.validate_progress_update(&pct, -1.0).is_err());
        assert!(agg.validate_progress_update(&pct, f64::NAN).is_err());

        let mut numeric = goal(TrackingType::Numeric);
        numeric.target_value = Some(10.0);
        assert!(agg.validate_progress_update(&numeric, 20.0).is_ok());
        assert!(matches!(
            agg.validate_progress_update(&numeric, 20.5),
            Err(EngineError::InvalidProgressValue { .. })
        ));
        assert!(agg.validate_progress_update(&numeric, -0.1).is_err());

        let mut auto = goal(TrackingType::Percentage);
        auto.auto_track = true;
        assert!(agg.validate_progress_update(&auto, 50.0).is_err());
    }

    fn daily_habit_with_done_days(days: i64) -> (Habit, Vec<HabitLog>) {
        let habit = Habit::new("Walk", "health", Difficulty::Easy, Frequency::Daily);
        let logs = (0..days)
            .map(|back| HabitLog::new(habit.id, today() - Duration::days(back), HabitState::Done))
            .collect();
        (habit, logs)
    }

    #[test]
    fn test_habit_contribution() {
        let agg = ProgressAggregator::default();
        let (habit, mut logs) = daily_habit_with_done_days(15);
        // Outside the 30-day window.
        logs.push(HabitLog::new(habit.id, today() - Duration::days(30), HabitState::Done));
        let book = LogBook::new(&logs);
        assert_eq!(agg.habit_contribution(&[&habit], &book, today()), 50.0);
    }

    #[test]
    fn test_habit_contribution_zero_expected() {
        let agg = ProgressAggregator::default();
        let habit = Habit::new(
            "Nothing",
            "misc",
            Difficulty::Easy,
            Frequency::SpecificWeekdays { days: Default::default() },
        );
        let logs: Vec<HabitLog> = Vec::new();
        let book = LogBook::new(&logs);
        assert_eq!(agg.habit_contribution(&[&habit], &book, today()), 0.0);
    }

    #[test]
    fn test_task_contribution() {
        let agg = ProgressAggregator::default();
        let mut once = Task::new("File taxes", TaskKind::OneTime);
        once.completed = true;
        let mut daily = Task::new("Inbox zero", TaskKind::Daily);
        daily.completed_dates.insert(today() - Duration::days(1));
        let open = Task::new("Call bank", TaskKind::OneTime);

        assert_eq!(agg.task_contribution(&[&once, &daily, &open], today()), 33.0);
        daily.completed_dates.insert(today());
        assert_eq!(agg.task_contribution(&[&once, &daily, &open], today()), 67.0);
        assert_eq!(agg.task_contribution(&[], today()), 0.0);
    }

    #[test]
    fn test_auto_progress_averages_both_kinds() {
        let agg = ProgressAggregator::default();
        let (habit, logs) = daily_habit_with_done_days(15);
        let mut task = Task::new("Sign up for race", TaskKind::OneTime);
        task.completed = true;

        let mut g = goal(TrackingType::Percentage);
        g.auto_track = true;
        g.linked_habit_ids.insert(habit.id);
        g.linked_task_ids.insert(task.id);

        let habits = vec![habit];
        let tasks = vec![task];
        let book = LogBook::new(&logs);
        assert_eq!(agg.auto_progress(&g, &habits, &tasks, &book, today()), Some(75.0));
    }

    #[test]
    fn test_auto_progress_falls_back_without_links() {
        let agg = ProgressAggregator::default();
        let mut g = goal(TrackingType::Percentage);
        g.auto_track = true;
        g.current_progress = 42.0;
        let logs: Vec<HabitLog> = Vec::new();
        let book = LogBook::new(&logs);
        assert_eq!(agg.auto_progress(&g, &[], &[], &book, today()), None);
        assert_eq!(agg.compute_goal_progress(&g, &[], &[], &book, today()).percentage, 42.0);
    }

    #[test]
    fn test_recalculate_is_idempotent() {
        let agg = ProgressAggregator::default();
        let (habit, logs) = daily_habit_with_done_days(15);
        let mut g = goal(TrackingType::Numeric);
        g.target_value = Some(40.0);
        g.auto_track = true;
        g.linked_habit_ids.insert(habit.id);

        let habits = vec![habit];
        let book = LogBook::new(&logs);
        let first = agg.recalculate(&g, &habits, &[], &book, today());
        assert_eq!(first, Some(20.0));

        g.current_progress = 20.0;
        assert_eq!(agg.recalculate(&g, &habits, &[], &book, today()), None);
    }

    #[test]
    fn test_numeric_auto_progress_reads_back_exactly() {
        let agg = ProgressAggregator::default();
        let mut done = Task::new("Book venue", TaskKind::OneTime);
        done.completed = true;
        let open = Task::new("Send invites", TaskKind::OneTime);

        let mut g = goal(TrackingType::Numeric);
        g.target_value = Some(3.0);
        g.auto_track = true;
        g.linked_task_ids.insert(done.id);
        g.linked_task_ids.insert(open.id);

        let tasks = vec![done, open];
        let logs: Vec<HabitLog> = Vec::new();
        let book = LogBook::new(&logs);
        let auto = agg.auto_progress(&g, &[], &tasks, &book, today());
        assert_eq!(auto, Some(50.0));

        let report = agg.compute_goal_progress(&g, &[], &tasks, &book, today());
        assert_eq!(Some(report.percentage), auto);
        assert_eq!(report.label, "1.5/3");

        let stored = agg.recalculate(&g, &[], &tasks, &book, today()).unwrap();
        assert!((stored - 1.5).abs() < 1e-9);
        g.current_progress = stored;
        assert_eq!(agg.progress(&g).percentage, 50.0);
        assert_eq!(agg.recalculate(&g, &[], &tasks, &book, today()), None);
    }

    #[test]
    fn test_manual_goal_is_not_recalculated() {
        let agg = ProgressAggregator::default();
        let (habit, logs) = daily_habit_with_done_days(3);
        let mut g = goal(TrackingType::Percentage);
        g.linked_habit_ids.insert(habit.id);
        let book = LogBook::new(&logs);
        assert_eq!(agg.recalculate(&g, &[habit], &[], &book, today()), None);
    }
}
