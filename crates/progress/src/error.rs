//! Tracker service errors.

use cadence_core::EngineError;
use cadence_storage::StorageError;

/// Result alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors from the tracker service.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The engine rejected the operation
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The storage collaborator failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Referenced entity does not exist
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind
        kind: &'static str,
        /// Requested id
        id: String,
    },
}

impl TrackerError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
