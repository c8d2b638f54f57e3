//! Declarative row → sample mapping.

use std::sync::Arc;

use crate::metric::Descriptor;
use crate::probe::{Emitter, ProbeError};
use crate::source::Row;

/// Maps result rows onto metric families.
///
/// The first `label_columns` columns become label values; each following
/// column feeds one family, in order. A row therefore fans out into one
/// sample per family, all sharing the same label set. With no label
/// columns every family gets a single unlabeled series.
#[derive(Debug, Clone)]
pub struct RowMapping {
    label_columns: usize,
    families: Vec<Arc<Descriptor>>,
}

impl RowMapping {
    pub fn new(label_columns: usize, families: Vec<Arc<Descriptor>>) -> Self {
        Self {
            label_columns,
            families,
        }
    }

    pub fn families(&self) -> &[Arc<Descriptor>] {
        &self.families
    }

    /// Scan one row and emit its samples.
    ///
    /// The whole row is scanned before anything is emitted, so a bad
    /// column yields no partial output for that row.
    pub async fn emit_row(&self, row: &Row, emitter: &Emitter) -> Result<(), ProbeError> {
        let labels = (0..self.label_columns)
            .map(|index| row.text(index))
            .collect::<Result<Vec<_>, _>>()?;
        let values = (0..self.families.len())
            .map(|offset| row.f64(self.label_columns + offset))
            .collect::<Result<Vec<_>, _>>()?;

        for (desc, value) in self.families.iter().zip(values) {
            emitter.emit(desc, value, labels.clone()).await?;
        }
        Ok(())
    }

    /// Emit every row in order, stopping at the first failure.
    pub async fn emit_rows(&self, rows: &[Row], emitter: &Emitter) -> Result<(), ProbeError> {
        for row in rows {
            self.emit_row(row, emitter).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricKind, Sample};
    use crate::source::Value;

    fn counter(name: &str, labels: &[&str]) -> Arc<Descriptor> {
        Arc::new(Descriptor::new(name, "help", labels, MetricKind::Counter).unwrap())
    }

    async fn collect(mapping: &RowMapping, rows: &[Row]) -> (Result<(), ProbeError>, Vec<Sample>) {
        let (emitter, mut rx) = Emitter::channel("test", 64);
        let result = mapping.emit_rows(rows, &emitter).await;
        drop(emitter);

        let mut samples = Vec::new();
        while let Some(sample) = rx.recv().await {
            samples.push(sample);
        }
        (result, samples)
    }

    #[tokio::test]
    async fn test_grouped_rows_fan_out() {
        let mapping = RowMapping::new(
            1,
            vec![
                counter("rows_read_total", &["schema"]),
                counter("rows_changed_total", &["schema"]),
            ],
        );
        let rows = vec![
            Row::from(vec![Value::from("app"), Value::from(100u64), Value::from(5u64)]),
            Row::from(vec![Value::from("sys"), Value::from(3u64), Value::from(0u64)]),
        ];

        let (result, samples) = collect(&mapping, &rows).await;
        result.unwrap();
        assert_eq!(samples.len(), 4);

        let read: Vec<_> = samples
            .iter()
            .filter(|s| s.name() == "rows_read_total")
            .map(|s| (s.label_values()[0].as_str(), s.value()))
            .collect();
        assert_eq!(read, vec![("app", 100.0), ("sys", 3.0)]);

        let changed: Vec<_> = samples
            .iter()
            .filter(|s| s.name() == "rows_changed_total")
            .map(|s| (s.label_values()[0].as_str(), s.value()))
            .collect();
        assert_eq!(changed, vec![("app", 5.0), ("sys", 0.0)]);
    }

    #[tokio::test]
    async fn test_single_row_aggregate_is_unlabeled() {
        let mapping = RowMapping::new(0, vec![counter("requests_total", &[])]);
        let rows = vec![Row::from(vec![Value::from(42i64)])];

        let (result, samples) = collect(&mapping, &rows).await;
        result.unwrap();
        assert_eq!(samples.len(), 1);
        assert!(samples[0].label_values().is_empty());
        assert_eq!(samples[0].value(), 42.0);
    }

    #[tokio::test]
    async fn test_bad_row_stops_without_partial_output() {
        let mapping = RowMapping::new(
            1,
            vec![counter("a_total", &["schema"]), counter("b_total", &["schema"])],
        );
        let rows = vec![
            Row::from(vec![Value::from("app"), Value::from(1u64), Value::from(2u64)]),
            Row::from(vec![Value::from("bad"), Value::from(1u64), Value::Null]),
            Row::from(vec![Value::from("late"), Value::from(1u64), Value::from(2u64)]),
        ];

        let (result, samples) = collect(&mapping, &rows).await;
        assert!(matches!(result, Err(ProbeError::Query(_))));
        assert_eq!(samples.len(), 2, "only the first row was emitted");
    }

    #[tokio::test]
    async fn test_label_arity_mismatch_is_emission_error() {
        let mapping = RowMapping::new(0, vec![counter("a_total", &["schema"])]);
        let rows = vec![Row::from(vec![Value::from(1u64)])];

        let (result, samples) = collect(&mapping, &rows).await;
        assert!(matches!(result, Err(ProbeError::Emission(_))));
        assert!(samples.is_empty());
    }
}
