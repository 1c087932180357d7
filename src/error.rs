// ⚠️ Error taxonomy
// Every command returns one of these; main.rs turns them into terminal messages.

use chrono::Duration;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for macven.
#[derive(Error, Debug)]
pub enum MacvenError {
    /// Malformed MAC string (too short, mixed separators, non-hex)
    #[error("invalid MAC address '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// Canonical prefix has no record in the store
    #[error("no vendor registered for prefix {prefix}")]
    NotFound {
        prefix: String,
        /// Age of the local data, None if the store was never refreshed
        data_age: Option<Duration>,
    },

    /// Registry download failed (transport error or non-success status)
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    /// Refresh requested inside the minimum interval
    #[error("refresh skipped, {} minutes of cooldown remaining", .remaining.num_minutes())]
    CooldownActive {
        elapsed: Duration,
        remaining: Duration,
    },

    /// Another process holds the state file lock
    #[error("state file {} is being written by another process, try again", .path.display())]
    ConcurrentWriteConflict { path: PathBuf },

    /// Lookup requested before any refresh produced a store
    #[error("record store {} does not exist", .path.display())]
    StoreMissing { path: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV store error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("state file {} is unreadable: {reason}", .path.display())]
    State { path: PathBuf, reason: String },
}

impl MacvenError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MacvenError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_input(input: &str, reason: impl Into<String>) -> Self {
        MacvenError::InvalidInput {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the same command may succeed if simply run again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MacvenError::ConcurrentWriteConflict { .. }
                | MacvenError::CooldownActive { .. }
                | MacvenError::Network { .. }
        )
    }

    /// Expected outcomes the CLI reports and exits 0 on
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            MacvenError::InvalidInput { .. }
                | MacvenError::NotFound { .. }
                | MacvenError::Network { .. }
                | MacvenError::CooldownActive { .. }
                | MacvenError::ConcurrentWriteConflict { .. }
                | MacvenError::StoreMissing { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MacvenError>;
