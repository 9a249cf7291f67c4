use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};

/// Fully qualified table name.
///
/// The schema is absent for connectors that keep a single flat namespace, like
/// the system connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaTableName {
    schema: Option<String>,
    table: String,
}

impl SchemaTableName {
    /// An empty schema name is treated as absent.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        let schema = schema.into();
        Self {
            schema: (!schema.is_empty()).then_some(schema),
            table: table.into(),
        }
    }

    pub fn unqualified(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Display for SchemaTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => f.write_str(&self.table),
        }
    }
}

/// A possibly under-specified table name used for bulk column listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaTablePrefix {
    pub schema: Option<String>,
    pub table: Option<String>,
}

impl SchemaTablePrefix {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn schema(schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            table: None,
        }
    }

    pub fn table(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            table: Some(table.into()),
        }
    }

    pub fn matches(&self, name: &SchemaTableName) -> bool {
        let schema_ok = match &self.schema {
            None => true,
            Some(s) if s.is_empty() => name.schema().is_none(),
            Some(s) => name.schema() == Some(s.as_str()),
        };
        let table_ok = match &self.table {
            None => true,
            Some(t) => name.table() == t,
        };
        schema_ok && table_ok
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub hidden: bool,
    pub comment: Option<String>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
            hidden: false,
            comment: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn to_field(&self) -> Field {
        Field::new(&self.name, self.data_type.clone(), self.nullable)
    }
}

/// Read-only description of a table: its name and ordered columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorTableMetadata {
    pub table: SchemaTableName,
    pub columns: Vec<ColumnMetadata>,
}

impl ConnectorTableMetadata {
    pub fn new(table: SchemaTableName, columns: Vec<ColumnMetadata>) -> Self {
        Self { table, columns }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self.columns.iter().map(ColumnMetadata::to_field).collect();
        Arc::new(Schema::new(fields))
    }

    pub fn from_arrow_schema(table: SchemaTableName, schema: &Schema) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|f| ColumnMetadata::new(f.name(), f.data_type().clone(), f.is_nullable()))
            .collect();
        Self { table, columns }
    }
}
