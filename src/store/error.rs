//! Errors returned by [`LinkStore`](super::LinkStore) implementations.

use thiserror::Error;

/// Errors that can occur while reading or writing links.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Another writer holds the database lock, or no pooled connection freed up in time.
    #[error(
        "link store is busy: {0}\n  Suggestion: Another sharekeeper process may be running; try again shortly"
    )]
    Busy(String),

    /// The database could not be reached at all.
    #[error(
        "link store is unavailable: {0}\n  Suggestion: Check that the database path exists and is writable"
    )]
    Unavailable(String),

    /// A stored row could not be decoded.
    #[error("stored link is unreadable: {0}")]
    Corrupt(String),

    /// A persisted status value is not one of the known states.
    #[error(
        "invalid status '{status}' stored for '{url}'\n  Suggestion: Use one of: pending, active, failed"
    )]
    InvalidStatus {
        /// Key of the offending record.
        url: String,
        /// The unrecognized status text.
        status: String,
    },

    /// Any other query failure.
    #[error("link store query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// Creates an `InvalidStatus` error for an unrecognized status string.
    #[must_use]
    pub fn invalid_status(url: &str, status: &str) -> Self {
        Self::InvalidStatus {
            url: url.to_string(),
            status: status.to_string(),
        }
    }

    /// Returns true when the same operation may succeed if attempted again later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let message = err.to_string();
        match &err {
            sqlx::Error::PoolTimedOut => Self::Busy(message),
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) => Self::Unavailable(message),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => Self::Corrupt(message),
            sqlx::Error::Database(db) if db.code().is_some_and(|code| is_lock_code(&code)) => {
                Self::Busy(message)
            }
            _ => Self::Query(message),
        }
    }
}

/// `SQLITE_BUSY` (5) and `SQLITE_LOCKED` (6); extended codes keep these in the low byte.
fn is_lock_code(code: &str) -> bool {
    code.parse::<i32>()
        .is_ok_and(|value| matches!(value & 0xff, 5 | 6))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient_busy() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Busy(_)));
        assert!(err.is_transient());
        assert!(err.to_string().contains("try again shortly"));
    }

    #[test]
    fn test_closed_pool_is_unavailable() {
        let err = StoreError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_other_errors_are_query_failures() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Query(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_lock_codes() {
        assert!(is_lock_code("5"));
        assert!(is_lock_code("6"));
        assert!(is_lock_code("517"));
        assert!(is_lock_code("262"));
        assert!(!is_lock_code("19"));
        assert!(!is_lock_code("2067"));
        assert!(!is_lock_code("SQLITE_ERROR"));
    }

    #[test]
    fn test_invalid_status_message() {
        let err = StoreError::invalid_status("https://share.example/s/a", "unknown");
        let msg = err.to_string();
        assert!(msg.contains("invalid status"));
        assert!(msg.contains("unknown"));
        assert!(msg.contains("pending, active, failed"));
        assert!(!err.is_transient());
    }
}
