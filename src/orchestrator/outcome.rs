//! Pass outcome types and the exporter's self-metrics.

use std::sync::Arc;
use std::time::Duration;

use crate::metric::{Descriptor, MetricError, MetricKind, Sample, build_fq_name};
use crate::source::ServerVersion;

/// Subsystem of the exporter's own metrics.
const EXPORTER_SUBSYSTEM: &str = "exporter";

/// Terminal state of one probe in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Succeeded,
    /// Query, scan or emission failure, or a panicked task.
    Failed(String),
    /// Stopped by the pass deadline.
    Cancelled,
}

impl ProbeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Per-probe record of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub name: String,
    pub duration: Duration,
    pub status: ProbeStatus,
}

impl ProbeOutcome {
    pub fn new(name: impl Into<String>, duration: Duration, status: ProbeStatus) -> Self {
        Self {
            name: name.into(),
            duration,
            status,
        }
    }
}

/// Summary of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome {
    /// Outcomes of every probe that ran (or failed its gate under the
    /// `fail` policy), sorted by name.
    pub probes: Vec<ProbeOutcome>,
    /// Server version used for gating; `None` if it could not be read.
    pub server_version: Option<ServerVersion>,
    /// Whether the server answered the version read.
    pub up: bool,
    /// Gating succeeded and every probe outcome is a success.
    pub ok: bool,
    /// Passes started by this process, this one included.
    pub total_passes: u64,
    /// Wall-clock duration of the whole pass.
    pub duration: Duration,
}

impl PassOutcome {
    pub fn probe(&self, name: &str) -> Option<&ProbeOutcome> {
        self.probes.iter().find(|outcome| outcome.name == name)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.probes.iter().filter(|outcome| !outcome.status.is_success())
    }
}

/// Result of [`Orchestrator::scrape`](crate::orchestrator::Orchestrator::scrape).
#[derive(Debug, Clone)]
pub struct PassReport {
    /// Drained probe samples followed by the exporter's outcome samples.
    pub samples: Vec<Sample>,
    pub outcome: PassOutcome,
}

impl PassReport {
    /// Samples of one family.
    pub fn family<'a>(&'a self, fq_name: &'a str) -> impl Iterator<Item = &'a Sample> {
        self.samples
            .iter()
            .filter(move |sample| sample.name() == fq_name)
    }
}

/// Descriptors of the outcome samples appended to every pass.
#[derive(Debug, Clone)]
pub struct ExporterMetrics {
    up: Arc<Descriptor>,
    collector_success: Arc<Descriptor>,
    collector_duration: Arc<Descriptor>,
    scrape_ok: Arc<Descriptor>,
    scrapes_total: Arc<Descriptor>,
}

impl ExporterMetrics {
    pub fn new(namespace: &str) -> Result<Self, MetricError> {
        let up = Descriptor::new(
            build_fq_name(namespace, "", "up"),
            "Whether the database server is reachable.",
            &[],
            MetricKind::Gauge,
        )?;
        let collector_success = Descriptor::new(
            build_fq_name(namespace, EXPORTER_SUBSYSTEM, "collector_success"),
            "Whether a probe succeeded in the last pass.",
            &["collector"],
            MetricKind::Gauge,
        )?;
        let collector_duration = Descriptor::new(
            build_fq_name(namespace, EXPORTER_SUBSYSTEM, "collector_duration_seconds"),
            "Duration of a probe in the last pass.",
            &["collector"],
            MetricKind::Gauge,
        )?;
        let scrape_ok = Descriptor::new(
            build_fq_name(namespace, EXPORTER_SUBSYSTEM, "scrape_ok"),
            "Whether every probe of the last pass succeeded.",
            &[],
            MetricKind::Gauge,
        )?;
        let scrapes_total = Descriptor::new(
            build_fq_name(namespace, EXPORTER_SUBSYSTEM, "scrapes_total"),
            "Total number of passes.",
            &[],
            MetricKind::Counter,
        )?;

        Ok(Self {
            up: Arc::new(up),
            collector_success: Arc::new(collector_success),
            collector_duration: Arc::new(collector_duration),
            scrape_ok: Arc::new(scrape_ok),
            scrapes_total: Arc::new(scrapes_total),
        })
    }

    /// Render `outcome` as samples: per-probe success and duration, then the
    /// pass-level `up`, `scrape_ok` and `scrapes_total`.
    pub fn samples(&self, outcome: &PassOutcome) -> Result<Vec<Sample>, MetricError> {
        let mut samples = Vec::with_capacity(outcome.probes.len() * 2 + 3);
        for probe in &outcome.probes {
            samples.push(Sample::new(
                &self.collector_success,
                bool_value(probe.status.is_success()),
                vec![probe.name.clone()],
            )?);
            samples.push(Sample::new(
                &self.collector_duration,
                probe.duration.as_secs_f64(),
                vec![probe.name.clone()],
            )?);
        }
        samples.push(Sample::new(&self.up, bool_value(outcome.up), Vec::new())?);
        samples.push(Sample::new(&self.scrape_ok, bool_value(outcome.ok), Vec::new())?);
        samples.push(Sample::new(
            &self.scrapes_total,
            outcome.total_passes as f64,
            Vec::new(),
        )?);
        Ok(samples)
    }
}

fn bool_value(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}
