use std::collections::HashMap;
use std::sync::Arc;

use igloo_common::{
    ColumnMetadata, ConnectorTableMetadata, Error, Result, SchemaTableName, SchemaTablePrefix,
};
use igloo_connector::{
    ColumnHandle, ConnectorMetadata, ConnectorSession, ConnectorTransactionHandle, TableHandle,
};

use crate::catalog::{CatalogSnapshot, MemoryTable};
use crate::{MemoryColumnHandle, MemoryTableHandle, Shared};

/// Metadata over one transaction's pinned catalog. Every call fails with
/// `UnknownTransaction` once the transaction has been committed or rolled
/// back.
#[derive(Debug)]
pub struct MemoryMetadata {
    shared: Arc<Shared>,
    transaction: ConnectorTransactionHandle,
}

impl MemoryMetadata {
    pub(crate) fn new(shared: Arc<Shared>, transaction: ConnectorTransactionHandle) -> Self {
        Self {
            shared,
            transaction,
        }
    }

    fn snapshot(&self) -> Result<Arc<CatalogSnapshot>> {
        let state = self.shared.transaction_state(&self.transaction)?;
        Ok(state.snapshot.clone())
    }

    fn resolve(&self, table: &TableHandle) -> Result<Arc<MemoryTable>> {
        let snapshot = self.snapshot()?;
        let handle: MemoryTableHandle = table.decode(&self.transaction)?;
        snapshot
            .table(&handle.schema, &handle.table)
            .filter(|t| t.version == handle.version)
            .cloned()
            .ok_or_else(|| {
                Error::UnknownTableHandle(format!("{}.{}", handle.schema, handle.table))
            })
    }

    fn table_handle(&self, table: &MemoryTable) -> Result<TableHandle> {
        let handle = MemoryTableHandle {
            schema: table.name.schema().unwrap_or_default().to_string(),
            table: table.name.table().to_string(),
            version: table.version,
        };
        TableHandle::new(&self.transaction, &handle)
    }
}

impl ConnectorMetadata for MemoryMetadata {
    fn list_schema_names(&self, _session: &ConnectorSession) -> Result<Vec<String>> {
        let snapshot = self.snapshot()?;
        let names = snapshot.schema_names().cloned().collect();
        Ok(names)
    }

    fn get_table_handle(
        &self,
        _session: &ConnectorSession,
        name: &SchemaTableName,
    ) -> Result<Option<TableHandle>> {
        let snapshot = self.snapshot()?;
        let Some(schema) = name.schema() else {
            return Ok(None);
        };
        match snapshot.table(schema, name.table()) {
            Some(table) => Ok(Some(self.table_handle(table)?)),
            None => Ok(None),
        }
    }

    fn get_table_metadata(
        &self,
        _session: &ConnectorSession,
        table: &TableHandle,
    ) -> Result<ConnectorTableMetadata> {
        Ok(self.resolve(table)?.metadata.clone())
    }

    fn list_tables(
        &self,
        _session: &ConnectorSession,
        schema: Option<&str>,
    ) -> Result<Vec<SchemaTableName>> {
        let snapshot = self.snapshot()?;
        let names: Vec<SchemaTableName> = match schema {
            Some(schema) => snapshot.tables_in(schema).map(|t| t.name.clone()).collect(),
            None => snapshot.tables().map(|t| t.name.clone()).collect(),
        };
        Ok(names)
    }

    fn get_column_handles(
        &self,
        _session: &ConnectorSession,
        table: &TableHandle,
    ) -> Result<HashMap<String, ColumnHandle>> {
        let table = self.resolve(table)?;
        let mut handles = HashMap::with_capacity(table.metadata.columns.len());
        for (ordinal, column) in table.metadata.columns.iter().enumerate() {
            let handle = MemoryColumnHandle {
                schema: table.name.schema().unwrap_or_default().to_string(),
                table: table.name.table().to_string(),
                column: column.name.clone(),
                ordinal,
            };
            handles.insert(
                column.name.clone(),
                ColumnHandle::new(&self.transaction, &handle)?,
            );
        }
        Ok(handles)
    }

    fn get_column_metadata(
        &self,
        _session: &ConnectorSession,
        table: &TableHandle,
        column: &ColumnHandle,
    ) -> Result<ColumnMetadata> {
        let table = self.resolve(table)?;
        let column: MemoryColumnHandle = column.decode(&self.transaction)?;
        let same_table = table.name.schema() == Some(column.schema.as_str())
            && table.name.table() == column.table;
        table
            .metadata
            .columns
            .get(column.ordinal)
            .filter(|c| same_table && c.name == column.column)
            .cloned()
            .ok_or_else(|| {
                Error::UnknownColumnHandle(format!(
                    "column {}.{}.{} used with table {}",
                    column.schema, column.table, column.column, table.name
                ))
            })
    }

    fn list_table_columns(
        &self,
        _session: &ConnectorSession,
        prefix: &SchemaTablePrefix,
    ) -> Result<HashMap<SchemaTableName, Vec<ColumnMetadata>>> {
        let snapshot = self.snapshot()?;
        let columns = snapshot
            .tables()
            .filter(|t| prefix.matches(&t.name))
            .map(|t| (t.name.clone(), t.metadata.columns.clone()))
            .collect();
        Ok(columns)
    }
}
