//! Metric family descriptors.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::metric::MetricError;

/// Value semantics of a metric family.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MetricKind {
    /// Monotonically non-decreasing value.
    Counter,
    /// Point-in-time value.
    Gauge,
}

/// Join namespace, subsystem and name with `_`, skipping empty parts.
///
/// # Examples
///
/// ```
/// use dbscrape::metric::build_fq_name;
///
/// assert_eq!(build_fq_name("mysql", "info_schema", "tables"), "mysql_info_schema_tables");
/// assert_eq!(build_fq_name("mysql", "", "up"), "mysql_up");
/// ```
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

fn metric_name_regex() -> &'static Regex {
    static METRIC_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    METRIC_NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("failed to compile metric name regex")
    })
}

fn label_name_regex() -> &'static Regex {
    static LABEL_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    LABEL_NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-z_][a-z0-9_]*$").expect("failed to compile label name regex")
    })
}

/// Static identity of a metric family.
///
/// Immutable once built. Two samples belong to the same series iff they share
/// a descriptor and label values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Descriptor {
    fq_name: String,
    help: String,
    label_names: Vec<String>,
    kind: MetricKind,
}

impl Descriptor {
    /// Build a descriptor, validating the metric and label names.
    ///
    /// # Errors
    /// Returns `MetricError` if the name is not a valid metric name, or any
    /// label is not a lower-case identifier, reserved (`__` prefix), or repeated.
    pub fn new(
        fq_name: impl Into<String>,
        help: impl Into<String>,
        label_names: &[&str],
        kind: MetricKind,
    ) -> Result<Self, MetricError> {
        let fq_name = fq_name.into();
        if !metric_name_regex().is_match(&fq_name) {
            return Err(MetricError::InvalidName(fq_name));
        }

        let mut seen = HashSet::new();
        for label in label_names {
            if !label_name_regex().is_match(label) || label.starts_with("__") {
                return Err(MetricError::InvalidLabel {
                    metric: fq_name,
                    label: (*label).to_string(),
                });
            }
            if !seen.insert(*label) {
                return Err(MetricError::DuplicateLabel {
                    metric: fq_name,
                    label: (*label).to_string(),
                });
            }
        }

        Ok(Self {
            fq_name,
            help: help.into(),
            label_names: label_names.iter().map(|l| (*l).to_string()).collect(),
            kind,
        })
    }

    /// Fully-qualified metric name.
    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// Label names in declaration order.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {{{}}}", self.fq_name, self.label_names.join(","))
    }
}
