//! Built-in system tables.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use igloo_common::{ColumnMetadata, ConnectorTableMetadata, Result, SchemaTableName};
use igloo_connector::{ConnectorSession, Distribution, SystemTable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub node_id: String,
    pub http_uri: String,
    pub node_version: String,
    pub coordinator: bool,
    pub state: String,
}

impl NodeInfo {
    pub fn coordinator(node_id: impl Into<String>, http_uri: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            http_uri: http_uri.into(),
            node_version: env!("CARGO_PKG_VERSION").to_string(),
            coordinator: true,
            state: "active".to_string(),
        }
    }

    pub fn worker(node_id: impl Into<String>, http_uri: impl Into<String>) -> Self {
        Self {
            coordinator: false,
            ..Self::coordinator(node_id, http_uri)
        }
    }
}

fn string_column<T>(rows: &[T], f: impl Fn(&T) -> &str) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(rows.iter().map(f)))
}

/// `nodes`: the cluster members known when the connector was built.
#[derive(Debug)]
pub struct NodesTable {
    metadata: ConnectorTableMetadata,
    nodes: Vec<NodeInfo>,
}

impl NodesTable {
    pub fn new(nodes: Vec<NodeInfo>) -> Self {
        let metadata = ConnectorTableMetadata::new(
            SchemaTableName::unqualified("nodes"),
            vec![
                ColumnMetadata::new("node_id", DataType::Utf8, false),
                ColumnMetadata::new("http_uri", DataType::Utf8, false),
                ColumnMetadata::new("node_version", DataType::Utf8, false),
                ColumnMetadata::new("coordinator", DataType::Boolean, false),
                ColumnMetadata::new("state", DataType::Utf8, false),
            ],
        );
        Self { metadata, nodes }
    }
}

impl SystemTable for NodesTable {
    fn table_metadata(&self) -> &ConnectorTableMetadata {
        &self.metadata
    }

    fn distribution(&self) -> Distribution {
        Distribution::AllCoordinators
    }

    fn records(&self, _session: &ConnectorSession) -> Result<RecordBatch> {
        let coordinator: Vec<bool> = self.nodes.iter().map(|n| n.coordinator).collect();
        let columns = vec![
            string_column(&self.nodes, |n| n.node_id.as_str()),
            string_column(&self.nodes, |n| n.http_uri.as_str()),
            string_column(&self.nodes, |n| n.node_version.as_str()),
            Arc::new(BooleanArray::from(coordinator)) as ArrayRef,
            string_column(&self.nodes, |n| n.state.as_str()),
        ];
        Ok(RecordBatch::try_new(self.metadata.arrow_schema(), columns)?)
    }
}

/// `catalogs`: catalog name to connector id, as registered with the engine.
#[derive(Debug)]
pub struct CatalogsTable {
    metadata: ConnectorTableMetadata,
    catalogs: Vec<(String, String)>,
}

impl CatalogsTable {
    pub fn new(catalogs: Vec<(String, String)>) -> Self {
        let metadata = ConnectorTableMetadata::new(
            SchemaTableName::unqualified("catalogs"),
            vec![
                ColumnMetadata::new("catalog_name", DataType::Utf8, false),
                ColumnMetadata::new("connector_id", DataType::Utf8, false),
            ],
        );
        Self { metadata, catalogs }
    }
}

impl SystemTable for CatalogsTable {
    fn table_metadata(&self) -> &ConnectorTableMetadata {
        &self.metadata
    }

    fn records(&self, _session: &ConnectorSession) -> Result<RecordBatch> {
        let names = StringArray::from_iter_values(self.catalogs.iter().map(|(name, _)| name));
        let ids = StringArray::from_iter_values(self.catalogs.iter().map(|(_, id)| id));
        Ok(RecordBatch::try_new(
            self.metadata.arrow_schema(),
            vec![Arc::new(names), Arc::new(ids)],
        )?)
    }
}
