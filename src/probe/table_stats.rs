//! Table statistics from `information_schema.TABLE_STATISTICS`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::metric::{Descriptor, MetricError, MetricKind, build_fq_name};
use crate::probe::{Emitter, FeatureGate, INFORMATION_SCHEMA, Probe, ProbeError, RowMapping, USERSTAT};
use crate::source::{DataSource, ServerVersion};

const TABLE_STAT_QUERY: &str = "
    SELECT
        TABLE_SCHEMA,
        TABLE_NAME,
        ROWS_READ,
        ROWS_CHANGED,
        ROWS_CHANGED_X_INDEXES
    FROM information_schema.TABLE_STATISTICS
";

/// Row activity per table, labeled by schema and table.
#[derive(Debug, Clone)]
pub struct TableStats {
    mapping: RowMapping,
}

impl TableStats {
    pub const NAME: &'static str = "info_schema.tablestats";

    pub fn new(namespace: &str) -> Result<Self, MetricError> {
        let family = |name: &str, help: &str| -> Result<Arc<Descriptor>, MetricError> {
            Descriptor::new(
                build_fq_name(namespace, INFORMATION_SCHEMA, name),
                help,
                &["schema", "table"],
                MetricKind::Counter,
            )
            .map(Arc::new)
        };

        Ok(Self {
            mapping: RowMapping::new(
                2,
                vec![
                    family(
                        "table_statistics_rows_read_total",
                        "The number of rows read from the table.",
                    )?,
                    family(
                        "table_statistics_rows_changed_total",
                        "The number of rows changed in the table.",
                    )?,
                    family(
                        "table_statistics_rows_changed_x_indexes_total",
                        "The number of rows changed in the table, multiplied by the number of indexes changed.",
                    )?,
                ],
            ),
        })
    }
}

#[async_trait::async_trait]
impl Probe for TableStats {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn help(&self) -> &str {
        "If running with userstat=1, set to true to collect table statistics"
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
        let rows = source.query_rows(TABLE_STAT_QUERY, cancel).await?;
        self.mapping.emit_rows(&rows, emitter).await
    }
}
