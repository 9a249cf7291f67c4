use std::collections::{BTreeSet, HashMap};

use igloo_common::{
    ColumnMetadata, ConnectorTableMetadata, Error, Result, SchemaTableName, SchemaTablePrefix,
};
use igloo_connector::{
    ColumnHandle, ConnectorMetadata, ConnectorSession, ConnectorTransactionHandle, TableHandle,
};

use crate::registry::SystemTableRegistry;
use crate::{SystemColumnHandle, SystemTableHandle};

/// Generic-path metadata for the system connector.
///
/// When tables are not exposed the generic path is a stub: listings are
/// empty, names never resolve, and calls taking a table handle are not
/// supported. System tables are then reachable only through
/// `Connector::system_tables`.
#[derive(Debug)]
pub struct SystemMetadata {
    transaction: ConnectorTransactionHandle,
    registry: SystemTableRegistry,
    expose_tables: bool,
}

impl SystemMetadata {
    pub fn new(
        transaction: ConnectorTransactionHandle,
        registry: SystemTableRegistry,
        expose_tables: bool,
    ) -> Self {
        Self {
            transaction,
            registry,
            expose_tables,
        }
    }

    fn require_exposed(&self, op: &str) -> Result<()> {
        if self.expose_tables {
            Ok(())
        } else {
            Err(Error::not_supported(format!(
                "{} on connector {}: system tables are only reachable directly",
                op,
                self.transaction.connector_id()
            )))
        }
    }

    fn resolve(&self, table: &TableHandle) -> Result<ConnectorTableMetadata> {
        let handle: SystemTableHandle = table.decode(&self.transaction)?;
        self.registry
            .get(&handle.table)
            .map(|t| t.table_metadata().clone())
            .ok_or_else(|| Error::UnknownTableHandle(handle.table.to_string()))
    }
}

impl ConnectorMetadata for SystemMetadata {
    fn list_schema_names(&self, _session: &ConnectorSession) -> Result<Vec<String>> {
        if !self.expose_tables {
            return Ok(Vec::new());
        }
        let schemas: BTreeSet<String> = self
            .registry
            .names()
            .filter_map(|n| n.schema().map(str::to_string))
            .collect();
        Ok(schemas.into_iter().collect())
    }

    fn get_table_handle(
        &self,
        _session: &ConnectorSession,
        name: &SchemaTableName,
    ) -> Result<Option<TableHandle>> {
        if !self.expose_tables || self.registry.get(name).is_none() {
            return Ok(None);
        }
        let handle = SystemTableHandle {
            table: name.clone(),
        };
        Ok(Some(TableHandle::new(&self.transaction, &handle)?))
    }

    fn get_table_metadata(
        &self,
        _session: &ConnectorSession,
        table: &TableHandle,
    ) -> Result<ConnectorTableMetadata> {
        self.require_exposed("get_table_metadata")?;
        self.resolve(table)
    }

    fn list_tables(
        &self,
        _session: &ConnectorSession,
        schema: Option<&str>,
    ) -> Result<Vec<SchemaTableName>> {
        if !self.expose_tables {
            return Ok(Vec::new());
        }
        let prefix = SchemaTablePrefix {
            schema: schema.map(str::to_string),
            table: None,
        };
        let names = self
            .registry
            .names()
            .filter(|n| prefix.matches(n))
            .cloned()
            .collect();
        Ok(names)
    }

    fn get_column_handles(
        &self,
        _session: &ConnectorSession,
        table: &TableHandle,
    ) -> Result<HashMap<String, ColumnHandle>> {
        self.require_exposed("get_column_handles")?;
        let metadata = self.resolve(table)?;
        metadata
            .columns
            .iter()
            .map(|c| -> Result<(String, ColumnHandle)> {
                let handle = SystemColumnHandle {
                    table: metadata.table.clone(),
                    column: c.name.clone(),
                };
                let column = ColumnHandle::new(&self.transaction, &handle)?;
                Ok((c.name.clone(), column))
            })
            .collect()
    }

    fn get_column_metadata(
        &self,
        _session: &ConnectorSession,
        table: &TableHandle,
        column: &ColumnHandle,
    ) -> Result<ColumnMetadata> {
        self.require_exposed("get_column_metadata")?;
        let metadata = self.resolve(table)?;
        let column: SystemColumnHandle = column.decode(&self.transaction)?;
        if column.table != metadata.table {
            return Err(Error::UnknownColumnHandle(format!(
                "column {} of {} used with table {}",
                column.column, column.table, metadata.table
            )));
        }
        metadata
            .column(&column.column)
            .cloned()
            .ok_or_else(|| {
                Error::UnknownColumnHandle(format!("{}.{}", metadata.table, column.column))
            })
    }

    fn list_table_columns(
        &self,
        _session: &ConnectorSession,
        prefix: &SchemaTablePrefix,
    ) -> Result<HashMap<SchemaTableName, Vec<ColumnMetadata>>> {
        if !self.expose_tables {
            return Ok(HashMap::new());
        }
        Ok(self
            .registry
            .tables()
            .into_iter()
            .filter(|t| prefix.matches(t.name()))
            .map(|t| (t.name().clone(), t.table_metadata().columns.clone()))
            .collect())
    }
}
