//! In-memory scripted data source.
//!
//! Answers queries from canned responses keyed by a SQL fragment. Used by the
//! test suites to drive probes and whole passes without a live server.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::source::{DataSource, Row, ServerVersion, SourceError};

/// Canned answer for queries containing a fragment.
#[derive(Debug, Clone)]
pub enum Response {
    /// Return these rows.
    Rows(Vec<Row>),
    /// Fail with this message.
    Error(String),
    /// Return the rows after a delay, honoring cancellation.
    Delayed(Duration, Vec<Row>),
    /// Block until cancelled.
    Hang,
    /// Block forever, ignoring cancellation.
    Stuck,
}

/// Scripted [`DataSource`].
///
/// The first registered fragment contained in the SQL text wins.
#[derive(Debug)]
pub struct MemorySource {
    version: Result<String, String>,
    responses: Vec<(String, Response)>,
    counts: Mutex<HashMap<String, usize>>,
    version_reads: AtomicUsize,
}

impl MemorySource {
    /// Create a source reporting `version` (e.g., `"8.0.35"`).
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: Ok(version.into()),
            responses: Vec::new(),
            counts: Mutex::new(HashMap::new()),
            version_reads: AtomicUsize::new(0),
        }
    }

    /// Fail every version read with `message`.
    pub fn with_version_error(mut self, message: impl Into<String>) -> Self {
        self.version = Err(message.into());
        self
    }

    pub fn with_response(mut self, fragment: impl Into<String>, response: Response) -> Self {
        self.responses.push((fragment.into(), response));
        self
    }

    pub fn with_rows(self, fragment: impl Into<String>, rows: Vec<Row>) -> Self {
        self.with_response(fragment, Response::Rows(rows))
    }

    pub fn with_error(self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.with_response(fragment, Response::Error(message.into()))
    }

    /// Number of executed queries that matched `fragment`.
    pub fn query_count(&self, fragment: &str) -> usize {
        self.counts
            .lock()
            .map(|counts| counts.get(fragment).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of server version reads.
    pub fn version_reads(&self) -> usize {
        self.version_reads.load(Ordering::Relaxed)
    }

    fn lookup(&self, sql: &str) -> Option<(&str, &Response)> {
        self.responses
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(fragment, response)| (fragment.as_str(), response))
    }
}

#[async_trait::async_trait]
impl DataSource for MemorySource {
    async fn query_rows(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, SourceError> {
        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }

        let (fragment, response) = self
            .lookup(sql)
            .ok_or_else(|| SourceError::Other(format!("no scripted response for: {sql}")))?;

        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(fragment.to_string()).or_default() += 1;
        }

        match response {
            Response::Rows(rows) => Ok(rows.clone()),
            Response::Error(message) => Err(SourceError::Other(message.clone())),
            Response::Delayed(delay, rows) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(SourceError::Cancelled),
                    () = tokio::time::sleep(*delay) => Ok(rows.clone()),
                }
            }
            Response::Hang => {
                cancel.cancelled().await;
                Err(SourceError::Cancelled)
            }
            Response::Stuck => std::future::pending().await,
        }
    }

    async fn server_version(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ServerVersion, SourceError> {
        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }
        self.version_reads.fetch_add(1, Ordering::Relaxed);
        match &self.version {
            Ok(version) => ServerVersion::parse(version),
            Err(message) => Err(SourceError::Other(message.clone())),
        }
    }
}
