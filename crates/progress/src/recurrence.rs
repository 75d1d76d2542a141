//! Recurrence resolution - which commitments apply on a date.

use cadence_core::{weekday_index, Frequency, Habit, Task, TaskKind};
use chrono::{Datelike, NaiveDate};

/// Whether a recurrence rule applies on `date`.
///
/// `Weekly` is intentionally permissive: it is due every day and the user
/// picks which day to act on. Empty weekday or month-day sets are never due.
pub fn is_due(rule: &Frequency, date: NaiveDate) -> bool {
    match rule {
        Frequency::Daily => true,
        Frequency::Weekly { .. } => true,
        Frequency::SpecificWeekdays { days } => days.contains(&weekday_index(date)),
        Frequency::SpecificMonthDays { days } => days.contains(&(date.day() as u8)),
    }
}

/// How many times a rule is expected to occur over `lookback_days`.
///
/// Weeks and months are counted as whole units (`lookback_days / 7` and at
/// least one month), matching how contributions are normalized.
pub fn expected_occurrences(rule: &Frequency, lookback_days: u32) -> u32 {
    let weeks = lookback_days / 7;
    let months = (lookback_days / 30).max(1);
    match rule {
        Frequency::Daily => lookback_days,
        Frequency::Weekly { days } => (days.len() as u32).max(1) * weeks,
        Frequency::SpecificWeekdays { days } => days.len() as u32 * weeks,
        Frequency::SpecificMonthDays { days } => days.len() as u32 * months,
    }
}

/// Anything that can be scheduled on calendar days.
pub trait Schedulable {
    /// Whether this commitment applies on `date`.
    fn is_due_on(&self, date: NaiveDate) -> bool;
}

impl Schedulable for Habit {
    fn is_due_on(&self, date: NaiveDate) -> bool {
        !self.archived && is_due(&self.frequency, date)
    }
}

impl Schedulable for Task {
    fn is_due_on(&self, date: NaiveDate) -> bool {
        match self.kind {
            TaskKind::Daily => true,
            TaskKind::OneTime => !self.completed,
            TaskKind::Monthly => {
                self.month_days.contains(&(date.day() as u8)) || self.dates.contains(&date)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::Difficulty;
    use chrono::Duration;
    use std::collections::BTreeSet;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn set(days: &[u8]) -> BTreeSet<u8> {
        days.iter().copied().collect()
    }

    #[test]
    fn test_daily_and_weekly_always_due() {
        let date = d(2024, 7, 17);
        assert!(is_due(&Frequency::Daily, date));
        assert!(is_due(&Frequency::Weekly { days: set(&[]) }, date));
        assert!(is_due(&Frequency::Weekly { days: set(&[0]) }, date));
    }

    #[test]
    fn test_specific_weekdays_mon_wed() {
        let rule = Frequency::SpecificWeekdays { days: set(&[1, 3]) };
        // 2024-07-15 Monday, 16 Tuesday, 17 Wednesday
        assert!(is_due(&rule, d(2024, 7, 15)));
        assert!(!is_due(&rule, d(2024, 7, 16)));
        assert!(is_due(&rule, d(2024, 7, 17)));
    }

    #[test]
    fn test_empty_sets_never_due() {
        let weekdays = Frequency::SpecificWeekdays { days: set(&[]) };
        let month_days = Frequency::SpecificMonthDays { days: set(&[]) };
        let start = d(2024, 1, 1);
        for offset in 0..400 {
            let date = start + Duration::days(offset);
            assert!(!is_due(&weekdays, date));
            assert!(!is_due(&month_days, date));
        }
    }

    #[test]
    fn test_month_days() {
        let rule = Frequency::SpecificMonthDays { days: set(&[1, 31]) };
        assert!(is_due(&rule, d(2024, 3, 1)));
        assert!(is_due(&rule, d(2024, 3, 31)));
        assert!(!is_due(&rule, d(2024, 4, 30)));
    }

    #[test]
    fn test_archived_habit_never_due() {
        let mut habit = Habit::new("Meditate", "health", Difficulty::Medium, Frequency::Daily);
        assert!(habit.is_due_on(d(2024, 1, 1)));
        habit.archived = true;
        assert!(!habit.is_due_on(d(2024, 1, 1)));
    }

    #[test]
    fn test_task_schedules() {
        let date = d(2024, 6, 15);

        let mut once = Task::new("Renew passport", TaskKind::OneTime);
        assert!(once.is_due_on(date));
        once.completed = true;
        assert!(!once.is_due_on(date));

        let mut monthly = Task::new("Pay rent", TaskKind::Monthly);
        assert!(!monthly.is_due_on(date));
        monthly.month_days.insert(15);
        assert!(monthly.is_due_on(date));

        let mut listed = Task::new("Dentist", TaskKind::Monthly);
        listed.dates.insert(date);
        assert!(listed.is_due_on(date));
        assert!(!listed.is_due_on(d(2024, 6, 16)));
    }

    #[test]
    fn test_expected_occurrences_over_thirty_days() {
        assert_eq!(expected_occurrences(&Frequency::Daily, 30), 30);
        assert_eq!(expected_occurrences(&Frequency::Weekly { days: set(&[]) }, 30), 4);
        assert_eq!(expected_occurrences(&Frequency::Weekly { days: set(&[1, 4]) }, 30), 8);
        assert_eq!(expected_occurrences(&Frequency::SpecificWeekdays { days: set(&[1, 3, 5]) }, 30), 12);
        assert_eq!(expected_occurrences(&Frequency::SpecificWeekdays { days: set(&[]) }, 30), 0);
        assert_eq!(expected_occurrences(&Frequency::SpecificMonthDays { days: set(&[1, 15]) }, 30), 2);
    }
}
