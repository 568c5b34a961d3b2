//! Error types for pacer-core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("preference namespace '{0}' has not been opened")]
    NamespaceNotOpen(String),

    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("already signed in for {date}")]
    AlreadySignedToday { date: String },

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("no user is logged in")]
    NotLoggedIn,

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

impl Error {
    /// True for the duplicate sign-in condition, so callers can show a
    /// dedicated message instead of a generic failure.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::AlreadySignedToday { .. })
    }
}
