//! Data Source Layer
//!
//! The read-only query service probes run against.
//!
//! # Components
//!
//! - [`DataSource`]: Async query trait shared by all probes of a pass
//! - [`Row`] / [`Value`]: Positional result rows
//! - [`ServerVersion`]: Two-part `major.minor` server version used for gating
//! - [`MySqlSource`]: sqlx-backed MySQL implementation
//! - [`MemorySource`]: Scripted in-memory implementation
//!
//! Every call takes a [`CancellationToken`]; implementations must return
//! [`SourceError::Cancelled`] promptly once it fires.

mod error;
pub mod memory;
pub mod mysql;
mod row;
mod version;

pub use error::SourceError;
pub use memory::{MemorySource, Response};
pub use mysql::MySqlSource;
pub use row::{Row, Value};
pub use version::ServerVersion;

use tokio_util::sync::CancellationToken;

/// Read-only query service shared by concurrently running probes.
///
/// Implementations must tolerate concurrent calls from several probe tasks
/// (a connection pool, not a single connection).
#[async_trait::async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Run a query and return every row, in server order.
    async fn query_rows(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, SourceError>;

    /// Run a query and return its first row, if any.
    async fn query_row(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Row>, SourceError> {
        Ok(self.query_rows(sql, cancel).await?.into_iter().next())
    }

    /// Read the live server version.
    async fn server_version(&self, cancel: &CancellationToken)
    -> Result<ServerVersion, SourceError>;
}
