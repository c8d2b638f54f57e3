//! Request rate from `performance_schema.global_status`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::metric::{Descriptor, MetricError, MetricKind, build_fq_name};
use crate::probe::{Emitter, INFORMATION_SCHEMA, Probe, ProbeError, RowMapping};
use crate::source::{DataSource, ServerVersion};

const GLOBAL_STATUS_REQUEST_RATES_QUERY: &str = "
    SELECT
        CAST(COALESCE(SUM(variable_value), 0) AS UNSIGNED) AS sum_request_rate
    FROM performance_schema.global_status
    WHERE variable_name IN ('com_select', 'com_update', 'com_delete', 'com_insert')
";

/// Sum of the `Com_select/update/delete/insert` statement counters.
///
/// Single-row aggregate: one unlabeled series.
#[derive(Debug, Clone)]
pub struct GlobalStatusRequestRatesSum {
    mapping: RowMapping,
}

impl GlobalStatusRequestRatesSum {
    pub const NAME: &'static str = "globalStatusRequestRatesSum";

    pub fn new(namespace: &str) -> Result<Self, MetricError> {
        let total = Descriptor::new(
            build_fq_name(namespace, INFORMATION_SCHEMA, "global_status_request_rate"),
            "The total count of requests.",
            &[],
            MetricKind::Counter,
        )?;

        Ok(Self {
            mapping: RowMapping::new(0, vec![Arc::new(total)]),
        })
    }
}

#[async_trait::async_trait]
impl Probe for GlobalStatusRequestRatesSum {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn help(&self) -> &str {
        "Returns request rate from performance_schema.global_status"
    }

    fn min_version(&self) -> ServerVersion {
        ServerVersion::new(5, 7)
    }

    async fn run(
        &self,
        source: &dyn DataSource,
        emitter: &Emitter,
        cancel: &CancellationToken,
    ) -> Result<(), ProbeError> {
        let rows = source
            .query_rows(GLOBAL_STATUS_REQUEST_RATES_QUERY, cancel)
            .await?;
        self.mapping.emit_rows(&rows, emitter).await
    }
}
