use std::fmt::Debug;

use arrow::record_batch::RecordBatch;
use igloo_common::{ConnectorTableMetadata, Result, SchemaTableName};

use crate::session::ConnectorSession;

/// Where a system table's rows can be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distribution {
    AllNodes,
    AllCoordinators,
    SingleCoordinator,
}

/// A built-in table that owns its schema and computes its rows on demand.
///
/// System tables are never split; a scan is a single implicit split over the
/// whole table. Engine state they need is handed to them at construction.
pub trait SystemTable: Debug + Send + Sync {
    fn table_metadata(&self) -> &ConnectorTableMetadata;

    fn name(&self) -> &SchemaTableName {
        &self.table_metadata().table
    }

    fn distribution(&self) -> Distribution {
        Distribution::SingleCoordinator
    }

    /// Computes the table's rows, with columns in `table_metadata` order.
    fn records(&self, session: &ConnectorSession) -> Result<RecordBatch>;
}
