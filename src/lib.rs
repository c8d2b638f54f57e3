//! dbscrape - Database Introspection Exporter
//!
//! This crate provides a pluggable framework for scraping a relational
//! database's introspection tables into Prometheus metrics. It can be used as
//! a library, or run as a standalone exporter with the `dbscrape` executable.
//!
//! # Architecture
//!
//! - **Probes**: Versioned, feature-gated units of collection ([`probe`])
//! - **Orchestrator**: Concurrent, cancellable collection passes ([`orchestrator`])
//! - **Metric model**: Descriptors and samples ([`metric`])
//! - **Data source**: Read-only query service, MySQL or scripted ([`source`])
//! - **Exposition**: Prometheus text format ([`exposition`]) over HTTP ([`server`])
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use dbscrape::{MySqlSource, Orchestrator, ProbeRegistry, ScrapeOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ProbeRegistry::with_defaults("mysql")?;
//! let source = MySqlSource::new("mysql://exporter@127.0.0.1:3306/", 4, Duration::from_secs(5))?;
//! let orchestrator =
//!     Orchestrator::new(Arc::new(registry), Arc::new(source), ScrapeOptions::default())?;
//!
//! let report = orchestrator.scrape(Duration::from_secs(10)).await;
//! println!("{}", dbscrape::exposition::render(&report)?.body);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod exposition;
pub mod metric;
pub mod orchestrator;
pub mod probe;
pub mod server;
pub mod source;

pub use config::{AppConfig, ConfigError};
pub use metric::{Descriptor, MetricError, MetricKind, Sample};
pub use orchestrator::{GateFailurePolicy, Orchestrator, PassOutcome, PassReport, ScrapeOptions};
pub use probe::{Probe, ProbeError, ProbeRegistry};
pub use source::{DataSource, MemorySource, MySqlSource, ServerVersion, SourceError};
