//! Prometheus text exposition of a pass.
//!
//! Each pass is rendered into a fresh [`prometheus::Registry`]: one
//! `GaugeVec`/`CounterVec` per descriptor, one child per label set. A sample
//! repeating an identity already rendered in the pass is not merged: it is
//! left out, logged, and listed in [`Rendered::duplicates`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

use crate::metric::{Descriptor, MetricKind, Sample};
use crate::orchestrator::PassReport;

/// Content type of the rendered body.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

/// Exposition errors.
#[derive(Debug, Error)]
pub enum ExpositionError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

impl Family {
    fn new(desc: &Descriptor) -> Result<Self, prometheus::Error> {
        let help = if desc.help().is_empty() {
            desc.fq_name()
        } else {
            desc.help()
        };
        let opts = Opts::new(desc.fq_name(), help);
        let labels: Vec<&str> = desc.label_names().iter().map(String::as_str).collect();

        Ok(match desc.kind() {
            MetricKind::Gauge => Self::Gauge(GaugeVec::new(opts, &labels)?),
            MetricKind::Counter => Self::Counter(CounterVec::new(opts, &labels)?),
        })
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        match self {
            Self::Gauge(vec) => registry.register(Box::new(vec.clone())),
            Self::Counter(vec) => registry.register(Box::new(vec.clone())),
        }
    }

    fn record(&self, sample: &Sample) -> Result<(), prometheus::Error> {
        let values: Vec<&str> = sample.label_values().iter().map(String::as_str).collect();
        match self {
            Self::Gauge(vec) => vec.get_metric_with_label_values(&values)?.set(sample.value()),
            Self::Counter(vec) => {
                let value = sample.value();
                if value.is_nan() || value < 0.0 {
                    tracing::warn!(
                        metric = %sample.name(),
                        value,
                        "Dropping invalid counter value"
                    );
                    return Ok(());
                }
                let counter = vec.get_metric_with_label_values(&values)?;
                counter.reset();
                counter.inc_by(value);
            }
        }
        Ok(())
    }
}

/// A rendered pass.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    /// Exposition body.
    pub body: String,
    /// Series emitted more than once, as `name{label="value",...}`. Only the
    /// first value of each is in `body`.
    pub duplicates: Vec<String>,
}

/// Render every sample of `report` in the Prometheus text format.
pub fn render(report: &PassReport) -> Result<Rendered, ExpositionError> {
    render_samples(&report.samples)
}

/// Render `samples` in the Prometheus text format.
///
/// A descriptor whose name clashes with an earlier, different descriptor is
/// dropped with a warning.
pub fn render_samples(samples: &[Sample]) -> Result<Rendered, ExpositionError> {
    let registry = Registry::new();
    let mut families: HashMap<&str, (Arc<Descriptor>, Family)> = HashMap::new();
    let mut seen: HashSet<(&str, &[String])> = HashSet::with_capacity(samples.len());
    let mut duplicates = Vec::new();

    for sample in samples {
        let desc = sample.descriptor();
        let name = desc.fq_name();
        if !families.contains_key(name) {
            let family = Family::new(desc)?;
            family.register(&registry)?;
            families.insert(name, (Arc::clone(desc), family));
        }
        let Some((known, family)) = families.get(name) else {
            continue;
        };

        if !Arc::ptr_eq(known, desc) && **known != **desc {
            tracing::warn!(
                metric = %name,
                "Conflicting descriptors for one metric name, dropping sample"
            );
            continue;
        }

        if !seen.insert(sample.identity()) {
            let series = series_name(sample);
            tracing::warn!(series = %series, "Series collected twice in one pass, dropping repeat");
            duplicates.push(series);
            continue;
        }
        family.record(sample)?;
    }

    Ok(Rendered {
        body: TextEncoder::new().encode_to_string(&registry.gather())?,
        duplicates,
    })
}

fn series_name(sample: &Sample) -> String {
    let labels: Vec<String> = sample
        .labels()
        .map(|(name, value)| format!("{name}=\"{value}\""))
        .collect();
    if labels.is_empty() {
        return sample.name().to_string();
    }
    format!("{}{{{}}}", sample.name(), labels.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(name: &str, help: &str, labels: &[&str], kind: MetricKind) -> Arc<Descriptor> {
        Arc::new(Descriptor::new(name, help, labels, kind).unwrap())
    }

    #[test]
    fn test_render_counters_and_gauges() {
        let rows = desc("mysql_rows_read_total", "Rows read.", &["schema"], MetricKind::Counter);
        let size = desc("mysql_schema_bytes", "Schema size.", &["schema"], MetricKind::Gauge);
        let samples = vec![
            Sample::new(&rows, 100.0, vec!["app".into()]).unwrap(),
            Sample::new(&rows, 3.0, vec!["sys".into()]).unwrap(),
            Sample::new(&size, 16384.0, vec!["app".into()]).unwrap(),
        ];

        let body = render_samples(&samples).unwrap().body;

        assert!(body.contains("# HELP mysql_rows_read_total Rows read."));
        assert!(body.contains("# TYPE mysql_rows_read_total counter"));
        assert!(body.contains("mysql_rows_read_total{schema=\"app\"} 100"));
        assert!(body.contains("mysql_rows_read_total{schema=\"sys\"} 3"));
        assert!(body.contains("# TYPE mysql_schema_bytes gauge"));
        assert!(body.contains("mysql_schema_bytes{schema=\"app\"} 16384"));
    }

    #[test]
    fn test_duplicate_series_reported() {
        let rows = desc("mysql_rows_total", "Rows.", &["schema"], MetricKind::Counter);
        let samples = vec![
            Sample::new(&rows, 5.0, vec!["app".into()]).unwrap(),
            Sample::new(&rows, 7.0, vec!["app".into()]).unwrap(),
            Sample::new(&rows, 1.0, vec!["sys".into()]).unwrap(),
        ];

        let rendered = render_samples(&samples).unwrap();

        assert_eq!(rendered.duplicates, vec!["mysql_rows_total{schema=\"app\"}"]);
        assert!(rendered.body.contains("mysql_rows_total{schema=\"app\"} 5"));
        assert!(!rendered.body.contains("mysql_rows_total{schema=\"app\"} 7"));
        assert!(rendered.body.contains("mysql_rows_total{schema=\"sys\"} 1"));
    }

    #[test]
    fn test_no_duplicates() {
        let up = desc("mysql_up", "Up.", &[], MetricKind::Gauge);
        let rendered = render_samples(&[Sample::new(&up, 1.0, vec![]).unwrap()]).unwrap();
        assert!(rendered.duplicates.is_empty());
    }

    #[test]
    fn test_empty_help_and_unlabeled() {
        let up = desc("mysql_up", "", &[], MetricKind::Gauge);
        let body = render_samples(&[Sample::new(&up, 1.0, vec![]).unwrap()]).unwrap().body;

        assert!(body.contains("# HELP mysql_up mysql_up"));
        assert!(body.contains("mysql_up 1"));
    }

    #[test]
    fn test_negative_counter_dropped() {
        let total = desc("mysql_total", "Total.", &[], MetricKind::Counter);
        let body = render_samples(&[Sample::new(&total, -1.0, vec![]).unwrap()])
            .unwrap()
            .body;

        assert!(body.contains("# TYPE mysql_total counter") || body.is_empty());
        assert!(!body.contains("mysql_total -1"));
    }

    #[test]
    fn test_conflicting_descriptor_dropped() {
        let first = desc("mysql_clash", "First.", &["schema"], MetricKind::Gauge);
        let second = desc("mysql_clash", "Second.", &["table"], MetricKind::Gauge);
        let samples = vec![
            Sample::new(&first, 1.0, vec!["app".into()]).unwrap(),
            Sample::new(&second, 2.0, vec!["users".into()]).unwrap(),
        ];

        let body = render_samples(&samples).unwrap().body;
        assert!(body.contains("mysql_clash{schema=\"app\"} 1"));
        assert!(!body.contains("users"));
    }

    #[test]
    fn test_content_type() {
        assert!(content_type().starts_with("text/plain"));
    }
}
