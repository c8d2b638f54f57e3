//! TTL cache for the live server version.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::source::{DataSource, ServerVersion, SourceError};

/// Caches the last successful version read for `ttl`.
///
/// The lock is held across the read, so concurrent passes trigger at most
/// one refresh. Failed reads are not cached.
#[derive(Debug)]
pub struct VersionCache {
    ttl: Duration,
    cached: Mutex<Option<(ServerVersion, Instant)>>,
}

impl VersionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub async fn get(
        &self,
        source: &dyn DataSource,
        cancel: &CancellationToken,
    ) -> Result<ServerVersion, SourceError> {
        let mut cached = self.cached.lock().await;
        if let Some((version, read_at)) = *cached
            && read_at.elapsed() < self.ttl
        {
            return Ok(version);
        }

        let version = source.server_version(cancel).await?;
        tracing::debug!(version = %version, "Server version refreshed");
        *cached = Some((version, Instant::now()));
        Ok(version)
    }

    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
