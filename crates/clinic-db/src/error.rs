//! Error types for the connection provider.

use std::path::PathBuf;

/// Errors that can occur while opening or bootstrapping the clinic database.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The database file could not be opened, configured, or inspected.
    #[error("database connection failed for '{}': {source}", path.display())]
    ConnectionFailure {
        /// Location of the database file.
        path: PathBuf,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// A bootstrap statement failed with something other than a missing table.
    #[error("bootstrap statement #{index} failed: {source} (statement: {statement})")]
    BootstrapFailure {
        /// Zero-based position of the statement in the split script.
        index: usize,
        /// The statement text as executed.
        statement: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// The bootstrap script exists but could not be read.
    #[error("failed to read bootstrap script '{}': {source}", path.display())]
    ScriptRead {
        /// Location of the script.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A process-wide provider was already installed.
    #[error("a process-wide connection provider is already installed")]
    AlreadyInstalled,
}

impl DbError {
    /// Whether the application must stop when it sees this error.
    ///
    /// Every failure to produce a usable, fully bootstrapped connection is
    /// fatal. Only a duplicate [`install`](crate::install) is not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DbError::AlreadyInstalled)
    }
}
