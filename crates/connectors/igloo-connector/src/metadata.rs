use std::collections::HashMap;
use std::fmt::Debug;

use igloo_common::{
    ColumnMetadata, ConnectorTableMetadata, Result, SchemaTableName, SchemaTablePrefix,
};

use crate::handle::{ColumnHandle, TableHandle};
use crate::session::ConnectorSession;

/// Transaction-scoped resolution of schemas, tables and columns.
///
/// A `ConnectorMetadata` is obtained from `Connector::metadata` for one
/// transaction handle and only accepts handles issued under that handle.
/// Every call is read-only. Names that do not resolve produce empty or absent
/// results; handles from another transaction or table fail with the
/// `Unknown*Handle` errors.
pub trait ConnectorMetadata: Debug + Send + Sync {
    /// Sorted, duplicate free. Empty for schema-less connectors.
    fn list_schema_names(&self, session: &ConnectorSession) -> Result<Vec<String>>;

    fn get_table_handle(
        &self,
        session: &ConnectorSession,
        name: &SchemaTableName,
    ) -> Result<Option<TableHandle>>;

    fn get_table_metadata(
        &self,
        session: &ConnectorSession,
        table: &TableHandle,
    ) -> Result<ConnectorTableMetadata>;

    /// Every table across all schemas when `schema` is `None`.
    fn list_tables(
        &self,
        session: &ConnectorSession,
        schema: Option<&str>,
    ) -> Result<Vec<SchemaTableName>>;

    fn get_column_handles(
        &self,
        session: &ConnectorSession,
        table: &TableHandle,
    ) -> Result<HashMap<String, ColumnHandle>>;

    fn get_column_metadata(
        &self,
        session: &ConnectorSession,
        table: &TableHandle,
        column: &ColumnHandle,
    ) -> Result<ColumnMetadata>;

    fn list_table_columns(
        &self,
        session: &ConnectorSession,
        prefix: &SchemaTablePrefix,
    ) -> Result<HashMap<SchemaTableName, Vec<ColumnMetadata>>>;
}
