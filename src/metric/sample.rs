//! Metric samples.

use std::sync::Arc;

use crate::metric::{Descriptor, MetricError, MetricKind};

/// One value for one label set of a metric family.
///
/// Label values line up with [`Descriptor::label_names`] by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    desc: Arc<Descriptor>,
    value: f64,
    label_values: Vec<String>,
}

impl Sample {
    /// Create a sample for `desc`.
    ///
    /// # Errors
    /// Returns `MetricError::LabelCountMismatch` if the number of label values
    /// differs from the descriptor's label names.
    pub fn new(
        desc: &Arc<Descriptor>,
        value: f64,
        label_values: Vec<String>,
    ) -> Result<Self, MetricError> {
        if label_values.len() != desc.label_names().len() {
            return Err(MetricError::LabelCountMismatch {
                metric: desc.fq_name().to_string(),
                expected: desc.label_names().len(),
                got: label_values.len(),
            });
        }

        Ok(Self {
            desc: Arc::clone(desc),
            value,
            label_values,
        })
    }

    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.desc
    }

    pub fn name(&self) -> &str {
        self.desc.fq_name()
    }

    pub fn kind(&self) -> MetricKind {
        self.desc.kind()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// `(label name, label value)` pairs in descriptor order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.desc
            .label_names()
            .iter()
            .map(String::as_str)
            .zip(self.label_values.iter().map(String::as_str))
    }

    /// Series identity: metric name plus label values.
    pub fn identity(&self) -> (&str, &[String]) {
        (self.desc.fq_name(), &self.label_values)
    }
}
