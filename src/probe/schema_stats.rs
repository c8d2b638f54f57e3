//! Schema statistics from `information_schema.TABLE_STATISTICS`.
//!
//! Requires `userstat=ON` (Percona Server / MariaDB).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::metric::{Descriptor, MetricError, MetricKind, build_fq_name};
use crate::probe::{Emitter, FeatureGate, INFORMATION_SCHEMA, Probe, ProbeError, RowMapping, USERSTAT};
use crate::source::{DataSource, ServerVersion};

const SCHEMA_STAT_QUERY: &str = "
    SELECT
        TABLE_SCHEMA,
        CAST(SUM(ROWS_READ) AS UNSIGNED) AS ROWS_READ,
        CAST(SUM(ROWS_CHANGED) AS UNSIGNED) AS ROWS_CHANGED,
        CAST(SUM(ROWS_CHANGED_X_INDEXES) AS UNSIGNED) AS ROWS_CHANGED_X_INDEXES
    FROM information_schema.TABLE_STATISTICS
    GROUP BY TABLE_SCHEMA
";

/// Row activity per schema, one series per schema and family.
#[derive(Debug, Clone)]
pub struct SchemaStats {
    mapping: RowMapping,
}

impl SchemaStats {
    pub const NAME: &'static str = "info_schema.schemastats";

    pub fn new(namespace: &str) -> Result<Self, MetricError> {
        let family = |name: &str, help: &str| -> Result<Arc<Descriptor>, MetricError> {
            Descriptor::new(
                build_fq_name(namespace, INFORMATION_SCHEMA, name),
                help,
                &["schema"],
                MetricKind::Counter,
            )
            .map(Arc::new)
        };

        Ok(Self {
            mapping: RowMapping::new(
                1,
                vec![
                    family(
                        "schema_statistics_rows_read_total",
                        "The number of rows read from the schema.",
                    )?,
                    family(
                        "schema_statistics_rows_changed_total",
                        "The number of rows changed in the schema.",
                    )?,
                    family(
                        "schema_statistics_rows_changed_x_indexes_total",
                        "The number of rows changed in the schema, multiplied by the number of indexes changed.",
                    )?,
                ],
            ),
        })
    }
}

#[async_trait::async_trait]
impl Probe for SchemaStats {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn help(&self) -> &str {
        "If running with userstat=1, set to true to collect schema statistics"
    }

    fn min_version(&self) -> ServerVersion {
        ServerVersion::new(5, 1)
    }

    fn prerequisite(&self) -> Option<&FeatureGate> {
        Some(&USERSTAT)
    }

    async fn run(
        &self,
        source: &dyn DataSource,
        emitter: &Emitter,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        let rows = source.query_rows(SCHEMA_STAT_QUERY, cancel).await?;
        self.mapping.emit_rows(&rows, emitter).await
    }
}
