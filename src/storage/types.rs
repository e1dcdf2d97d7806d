use thiserror::Error;

use crate::language::Language;
use crate::news::GeopoliticalNews;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process has locked the database
    #[error("Another instance of newsdigest appears to be using the store. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// The last successful headlines categorization for one language.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsCacheEntry {
    pub language: Language,
    pub payload: GeopoliticalNews,
    /// Unix epoch milliseconds at which the payload was produced.
    pub fetched_at_ms: i64,
}

impl NewsCacheEntry {
    /// An entry is valid iff `now - fetched_at < ttl`.
    ///
    /// A timestamp in the future (clock moved backwards) counts as valid;
    /// the next refresh cycle overwrites it.
    pub fn is_valid(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.fetched_at_ms) < ttl_ms
    }

    /// Milliseconds left before the entry goes stale (zero when stale).
    pub fn remaining_ms(&self, now_ms: i64, ttl_ms: i64) -> i64 {
        ttl_ms
            .saturating_sub(now_ms.saturating_sub(self.fetched_at_ms))
            .max(0)
    }
}
