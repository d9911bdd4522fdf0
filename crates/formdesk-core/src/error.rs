//! Error types for the core library.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// CSV writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Submission not found.
    #[error("Submission not found: {0}")]
    NotFound(String),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A store request did not complete in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// No boundary cursor is stored for the page before the requested one.
    #[error("No cursor stored for page {0}")]
    CursorUnavailable(usize),
}

impl Error {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Unavailable(_) => true,
            Self::Database(err) => match err {
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => {
                    true
                }
                sqlx::Error::Database(db) => db
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .is_some_and(is_busy_or_locked),
                _ => false,
            },
            _ => false,
        }
    }
}

/// SQLITE_BUSY (5) or SQLITE_LOCKED (6), including extended codes such as
/// `SQLITE_BUSY_SNAPSHOT` (517).
const fn is_busy_or_locked(code: i32) -> bool {
    matches!(code & 0xff, 5 | 6)
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
