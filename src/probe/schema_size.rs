//! Schema sizes from `information_schema.TABLES`.
//!
//! Disabled by default: the query walks every table definition, which is
//! slow on servers with many schemas.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::metric::{Descriptor, MetricError, MetricKind, build_fq_name};
use crate::probe::{Emitter, INFORMATION_SCHEMA, Probe, ProbeError, RowMapping};
use crate::source::{DataSource, ServerVersion};

const SCHEMA_SIZE_QUERY: &str = "
    SELECT
        TABLE_SCHEMA,
        CAST(COALESCE(SUM(DATA_LENGTH), 0) AS UNSIGNED) AS DATA_LENGTH,
        CAST(COALESCE(SUM(INDEX_LENGTH), 0) AS UNSIGNED) AS INDEX_LENGTH,
        COUNT(*) AS TABLES
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA NOT IN ('mysql', 'performance_schema', 'information_schema', 'sys')
    GROUP BY TABLE_SCHEMA
";

/// On-disk size and table count per schema (gauges).
#[derive(Debug, Clone)]
pub struct SchemaSize {
    mapping: RowMapping,
}

impl SchemaSize {
    pub const NAME: &'static str = "info_schema.schemasize";

    pub fn new(namespace: &str) -> Result<Self, MetricError> {
        let family = |name: &str, help: &str| -> Result<Arc<Descriptor>, MetricError> {
            Descriptor::new(
                build_fq_name(namespace, INFORMATION_SCHEMA, name),
                help,
                &["schema"],
                MetricKind::Gauge,
            )
            .map(Arc::new)
        };

        Ok(Self {
            mapping: RowMapping::new(
                1,
                vec![
                    family("schema_data_length_bytes", "Total data length of the schema in bytes.")?,
                    family("schema_index_length_bytes", "Total index length of the schema in bytes.")?,
                    family("schema_tables", "Number of tables in the schema.")?,
                ],
            ),
        })
    }
}

#[async_trait::async_trait]
impl Probe for SchemaSize {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn help(&self) -> &str {
        "Collect data and index size per schema from information_schema.tables"
    }

    fn min_version(&self) -> ServerVersion {
        ServerVersion::new(5, 1)
    }

    fn enabled_by_default(&self) -> bool {
        false
    }

    async fn run(
        &self,
        source: &dyn DataSource,
        emitter: &Emitter,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        let rows = source.query_rows(SCHEMA_SIZE_QUERY, cancel).await?;
        self.mapping.emit_rows(&rows, emitter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, Row, Value};

    #[tokio::test]
    async fn test_schema_sizes_are_gauges() {
        let probe = SchemaSize::new("mysql").unwrap();
        let source = MemorySource::new("8.0.35").with_rows(
            "DATA_LENGTH",
            vec![Row::from(vec![
                Value::from("app"),
                Value::from(16384u64),
                Value::from(8192u64),
                Value::from(3i64),
            ])],
        );
        let (emitter, mut rx) = Emitter::channel(probe.name(), 16);

        probe
            .run(&source, &emitter, &CancellationToken::new())
            .await
            .unwrap();
        drop(emitter);

        let mut names = Vec::new();
        while let Some(sample) = rx.recv().await {
            assert_eq!(sample.kind(), MetricKind::Gauge);
            names.push(sample.name().to_string());
        }
        assert_eq!(
            names,
            vec![
                "mysql_info_schema_schema_data_length_bytes",
                "mysql_info_schema_schema_index_length_bytes",
                "mysql_info_schema_schema_tables",
            ]
        );
    }

    #[test]
    fn test_disabled_by_default() {
        let probe = SchemaSize::new("mysql").unwrap();
        assert!(!probe.enabled_by_default());
    }
}
