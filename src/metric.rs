//! Metric Model
//!
//! Immutable metric identities and the samples probes produce from them.
//!
//! # Components
//!
//! - [`Descriptor`]: Static identity of a metric family (name, help, labels, kind)
//! - [`Sample`]: One value for one label set of a [`Descriptor`]
//! - [`MetricKind`]: Counter or gauge semantics
//!
//! Descriptors are built once when a probe is constructed and shared by
//! reference (`Arc<Descriptor>`) with every sample of that family.

mod descriptor;
mod sample;

pub use descriptor::{Descriptor, MetricKind, build_fq_name};
pub use sample::Sample;

use thiserror::Error;

/// Errors raised while building descriptors or samples.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricError {
    /// Metric name violates `[a-zA-Z_:][a-zA-Z0-9_:]*`.
    #[error("invalid metric name: '{0}'")]
    InvalidName(String),

    /// Label name is not a lower-case identifier.
    #[error("metric '{metric}': invalid label name '{label}'")]
    InvalidLabel { metric: String, label: String },

    /// The same label name appears twice on one descriptor.
    #[error("metric '{metric}': duplicate label name '{label}'")]
    DuplicateLabel { metric: String, label: String },

    /// Sample label values do not line up with the descriptor's label names.
    #[error("metric '{metric}': expected {expected} label values, got {got}")]
    LabelCountMismatch {
        metric: String,
        expected: usize,
        got: usize,
    },
}
