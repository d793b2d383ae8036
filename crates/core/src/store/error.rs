//! Storage error types.

use thiserror::Error;

/// Failures reported by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed a statement.
    #[error("storage operation failed: {0}")]
    Database(String),

    /// Lock contention, serialization failure, or a unique constraint race.
    #[error("storage conflict: {0}")]
    Conflict(String),

    /// The final commit did not go through; nothing was written.
    #[error("commit failed: {0}")]
    Commit(String),
}

impl StoreError {
    /// Create a database error.
    #[must_use]
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Returns true if re-invoking the operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
