//! Unique identifiers for Cadence entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Generate a new id.
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a Habit
    HabitId
);

entity_id!(
    /// Unique identifier for a HabitLog row
    LogId
);

entity_id!(
    /// Unique identifier for a Goal
    GoalId
);

entity_id!(
    /// Unique identifier for a Milestone inside a goal
    MilestoneId
);

entity_id!(
    /// Unique identifier for a Task
    TaskId
);
