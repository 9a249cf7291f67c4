use async_trait::async_trait;
use igloo_common::{ConnectorId, Error, Result};
use igloo_connector::{
    ColumnHandle, ConnectorSession, ConnectorTransactionHandle, FixedSplitSource,
    MaterializedPageSource, PageSource, PageSourceProvider, Split, SplitManager, SplitSource,
    TableHandle,
};
use tracing::debug;

use crate::registry::SystemTableRegistry;
use crate::{SystemColumnHandle, SystemSplit, SystemTableHandle};

/// System tables are never split: every table yields exactly one split.
#[derive(Debug)]
pub struct SystemSplitManager {
    connector_id: ConnectorId,
    registry: SystemTableRegistry,
}

impl SystemSplitManager {
    pub fn new(connector_id: ConnectorId, registry: SystemTableRegistry) -> Self {
        Self {
            connector_id,
            registry,
        }
    }
}

#[async_trait]
impl SplitManager for SystemSplitManager {
    async fn get_splits(
        &self,
        transaction: &ConnectorTransactionHandle,
        _session: &ConnectorSession,
        table: &TableHandle,
    ) -> Result<Box<dyn SplitSource>> {
        transaction.check_connector(&self.connector_id)?;
        let handle: SystemTableHandle = table.decode(transaction)?;
        if self.registry.get(&handle.table).is_none() {
            return Err(Error::TableNotFound(handle.table.to_string()));
        }
        let payload = SystemSplit {
            table: handle.table,
        };
        let split = Split::new(transaction, &payload)?;
        Ok(Box::new(FixedSplitSource::new(vec![split])))
    }
}

/// Runs the table's computation and hands the result out as one page.
#[derive(Debug)]
pub struct SystemPageSourceProvider {
    connector_id: ConnectorId,
    registry: SystemTableRegistry,
}

impl SystemPageSourceProvider {
    pub fn new(connector_id: ConnectorId, registry: SystemTableRegistry) -> Self {
        Self {
            connector_id,
            registry,
        }
    }
}

#[async_trait]
impl PageSourceProvider for SystemPageSourceProvider {
    async fn create_page_source(
        &self,
        transaction: &ConnectorTransactionHandle,
        session: &ConnectorSession,
        split: &Split,
        columns: &[ColumnHandle],
    ) -> Result<Box<dyn PageSource>> {
        transaction.check_connector(&self.connector_id)?;
        let split: SystemSplit = split.decode(transaction)?;
        let table = self
            .registry
            .get(&split.table)
            .ok_or_else(|| Error::TableNotFound(split.table.to_string()))?;

        let metadata = table.table_metadata();
        let mut indices = Vec::with_capacity(columns.len());
        for column in columns {
            let column: SystemColumnHandle = column.decode(transaction)?;
            let index = metadata
                .column_index(&column.column)
                .filter(|_| column.table == split.table)
                .ok_or_else(|| {
                    Error::UnsupportedColumn(format!(
                        "{}.{} on {}",
                        column.table, column.column, split.table
                    ))
                })?;
            indices.push(index);
        }

        let records = table.records(session)?;
        debug!(table = %split.table, rows = records.num_rows(), "computed system table");
        let source = MaterializedPageSource::projected(vec![records], &indices)?;
        Ok(Box::new(source))
    }
}
