//! Data source error types.

use thiserror::Error;

/// Errors that can occur while querying the data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Query execution failed (sqlx error).
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// The pass cancellation token fired before the query completed.
    #[error("query cancelled")]
    Cancelled,

    /// A column could not be read as the requested type.
    #[error("column {index}: {reason}")]
    Scan { index: usize, reason: String },

    /// The server reported a version string that has no `major.minor` prefix.
    #[error("unrecognized server version: '{0}'")]
    Version(String),

    /// Backend-agnostic failure (used by non-sqlx sources).
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// Whether this error is a cancellation rather than a query failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
