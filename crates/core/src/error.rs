//! Engine error types.

use crate::habit::HabitState;
use thiserror::Error;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors returned by the recurrence and progress engine.
///
/// Re-logging `done` on an already completed day is not an error; it is
/// reported as an outcome by the streak engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A logging event asked for a state transition that cannot happen.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// State currently recorded for the day
        from: HabitState,
        /// Requested state
        to: HabitState,
    },

    /// Manual progress value outside the bounds of the goal's tracking type.
    #[error("invalid progress value {value}: {reason}")]
    InvalidProgressValue {
        /// Offending value
        value: f64,
        /// Human readable reason
        reason: String,
    },

    /// Malformed calendar date at the engine boundary.
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDateFormat(String),

    /// A tagged update failed boundary validation.
    #[error("invalid value for {field}: {reason}")]
    InvalidUpdate {
        /// Field being updated
        field: &'static str,
        /// Human readable reason
        reason: String,
    },
}

impl EngineError {
    pub(crate) fn invalid_update(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidUpdate {
            field,
            reason: reason.into(),
        }
    }

    /// Build an `InvalidProgressValue` error.
    pub fn invalid_progress(value: f64, reason: impl Into<String>) -> Self {
        Self::InvalidProgressValue {
            value,
            reason: reason.into(),
        }
    }
}
