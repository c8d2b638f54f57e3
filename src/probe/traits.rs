//! Core probe trait and error types.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::metric::MetricError;
use crate::probe::{Emitter, FeatureGate};
use crate::source::{DataSource, ServerVersion, SourceError};

/// Errors that end a probe's run for the current pass.
///
/// None of these abort the pass; they are recorded as a failed outcome for
/// the probe that returned them.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Query execution or row scan failed.
    #[error("query failed: {0}")]
    Query(SourceError),

    /// The pass deadline expired while the probe was running.
    #[error("cancelled")]
    Cancelled,

    /// A sample was malformed; remaining emissions are dropped.
    #[error("emission failed: {0}")]
    Emission(#[from] MetricError),

    /// The pass stopped draining samples.
    #[error("sample sink closed")]
    SinkClosed,
}

impl From<SourceError> for ProbeError {
    fn from(err: SourceError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Query(err)
        }
    }
}

/// A versioned, optionally feature-gated unit of metric collection.
///
/// Probes are stateless between passes: everything they need (descriptors,
/// queries) is fixed at construction, so concurrent passes need no locking.
///
/// # Contract
///
/// - `run` only reads through `source` and must not keep any handle from it
///   past its return.
/// - `run` passes `cancel` to every query and returns
///   [`ProbeError::Cancelled`] once it fires.
/// - Samples of one probe reach the pass in emission order.
#[async_trait::async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Unique, stable identifier (e.g., `info_schema.tablestats`).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn help(&self) -> &str;

    /// Lowest server version exposing the probed introspection surface.
    fn min_version(&self) -> ServerVersion;

    /// Server-side feature that must be enabled for this probe to run.
    fn prerequisite(&self) -> Option<&FeatureGate> {
        None
    }

    /// Whether the probe runs when configuration does not mention it.
    fn enabled_by_default(&self) -> bool {
        true
    }

    /// Perform one collection for the current pass.
    async fn run(
        &self,
        source: &dyn DataSource,
        emitter: &Emitter,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError>;
}
