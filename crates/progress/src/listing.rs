//! Category filters and sort orders for entity lists.

use std::cmp::Reverse;
use std::str::FromStr;

use cadence_core::{EngineError, Goal, Habit, Task};
use chrono::NaiveDate;

/// Entities that carry a category key.
pub trait Categorized {
    /// Category key, if any.
    fn category(&self) -> Option<&str>;
}

impl Categorized for Habit {
    fn category(&self) -> Option<&str> {
        Some(self.category.as_str())
    }
}

impl Categorized for Task {
    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

impl Categorized for Goal {
    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// Keep items in `category`. `None`, an empty key and `"all"` keep everything.
pub fn filter_by_category<T: Categorized>(items: Vec<T>, category: Option<&str>) -> Vec<T> {
    match category {
        None | Some("") | Some("all") => items,
        Some(key) => items.into_iter().filter(|item| item.category() == Some(key)).collect(),
    }
}

/// Orderings offered for habit lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HabitSort {
    /// Storage order, oldest first
    #[default]
    Created,
    /// Longest current streak first
    Streak,
    /// Easy to hard
    Difficulty,
    /// Hard to easy
    DifficultyDesc,
}

impl FromStr for HabitSort {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "streak" => Ok(Self::Streak),
            "difficulty" | "difficulty-asc" => Ok(Self::Difficulty),
            "difficulty-desc" => Ok(Self::DifficultyDesc),
            other => Err(EngineError::InvalidUpdate {
                field: "sort",
                reason: format!("expected created, streak, difficulty or difficulty-desc, got '{}'", other),
            }),
        }
    }
}

/// Sort habits in place. Ties keep their order.
pub fn sort_habits(habits: &mut [Habit], order: HabitSort) {
    match order {
        HabitSort::Created => {}
        HabitSort::Streak => habits.sort_by_key(|h| Reverse(h.current_streak)),
        HabitSort::Difficulty => habits.sort_by_key(|h| h.difficulty),
        HabitSort::DifficultyDesc => habits.sort_by_key(|h| Reverse(h.difficulty)),
    }
}

/// Open tasks first, then those done on `date`. Ties keep their order.
pub fn sort_tasks_by_completion(tasks: &mut [Task], date: NaiveDate) {
    tasks.sort_by_key(|t| t.is_completed_on(date));
}
