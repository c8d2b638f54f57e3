//! Probe Layer
//!
//! Pluggable units of metric collection. Each probe issues its queries
//! through a shared [`DataSource`](crate::source::DataSource) and pushes
//! samples into an [`Emitter`]; the orchestrator runs every eligible probe of
//! a pass concurrently.
//!
//! # Architecture
//!
//! - [`Probe`]: Core trait for implementing probes
//! - [`FeatureGate`] / [`eligible`]: Version and feature gating
//! - [`RowMapping`]: Declarative row to sample fan-out
//! - [`ProbeRegistry`]: Ordered set of probes with per-probe enablement
//!
//! # Example
//!
//! ```rust,no_run
//! use dbscrape::probe::ProbeRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = ProbeRegistry::with_defaults("mysql")?;
//! registry.set_enabled("info_schema.schemasize", true)?;
//! # Ok(())
//! # }
//! ```

mod emitter;
mod gate;
pub mod global_status;
mod mapping;
mod registry;
pub mod schema_size;
pub mod schema_stats;
pub mod table_stats;
mod traits;

use std::sync::Arc;

pub use emitter::Emitter;
pub use gate::{FeatureGate, FeatureState, GateStatus, USERSTAT, eligible};
pub use global_status::GlobalStatusRequestRatesSum;
pub use mapping::RowMapping;
pub use registry::{ProbeInfo, ProbeRegistry};
pub use schema_size::SchemaSize;
pub use schema_stats::SchemaStats;
pub use table_stats::TableStats;
pub use traits::{Probe, ProbeError};

use crate::metric::MetricError;

/// Subsystem shared by the shipped `information_schema` style probes.
pub const INFORMATION_SCHEMA: &str = "info_schema";

/// Instantiate every shipped probe under `namespace`.
pub fn default_probes(namespace: &str) -> Result<Vec<Arc<dyn Probe>>, MetricError> {
    Ok(vec![
        Arc::new(GlobalStatusRequestRatesSum::new(namespace)?),
        Arc::new(SchemaStats::new(namespace)?),
        Arc::new(TableStats::new(namespace)?),
        Arc::new(SchemaSize::new(namespace)?),
    ])
}
