use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use dashmap::DashMap;
use igloo_common::{ConnectorTableMetadata, Error, Result, SchemaTableName};

/// One immutable version of a table. Appends replace the version held by the
/// catalog; transactions keep reading the version they pinned.
#[derive(Debug)]
pub struct MemoryTable {
    pub name: SchemaTableName,
    pub metadata: ConnectorTableMetadata,
    pub version: u64,
    data: RecordBatch,
}

impl MemoryTable {
    fn empty(name: SchemaTableName, schema: SchemaRef) -> Self {
        let metadata = ConnectorTableMetadata::from_arrow_schema(name.clone(), &schema);
        Self {
            name,
            metadata,
            version: 0,
            data: RecordBatch::new_empty(schema),
        }
    }

    pub fn schema(&self) -> SchemaRef {
        self.data.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.data.num_rows()
    }

    /// All rows of this version as a single batch.
    pub fn data(&self) -> &RecordBatch {
        &self.data
    }

    fn with_appended(&self, batch: &RecordBatch) -> Result<Self> {
        if batch.schema().fields() != self.schema().fields() {
            return Err(Error::Execution(format!(
                "Batch schema does not match table {}",
                self.name
            )));
        }
        let data = concat_batches(&self.schema(), [&self.data, batch])?;
        Ok(Self {
            name: self.name.clone(),
            metadata: self.metadata.clone(),
            version: self.version + 1,
            data,
        })
    }
}

#[derive(Debug)]
pub struct Schema {
    pub name: String,
    pub tables: DashMap<String, Arc<MemoryTable>>,
}

impl Schema {
    pub fn new(name: String) -> Self {
        Self {
            name,
            tables: DashMap::new(),
        }
    }
}

/// Mutable catalog shared by all transactions of a memory connector.
#[derive(Debug, Default)]
pub struct Catalog {
    pub schemas: DashMap<String, Arc<Schema>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            schemas: DashMap::new(),
        }
    }

    pub fn add_schema(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidIdentifier(
                "schema name must not be empty".to_string(),
            ));
        }
        if self.schemas.contains_key(name) {
            return Err(Error::Execution(format!("Schema {} already exists", name)));
        }
        let schema = Arc::new(Schema::new(name.to_string()));
        self.schemas.insert(name.to_string(), schema);
        Ok(())
    }

    pub fn get_schema(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(name).map(|s| s.value().clone())
    }

    pub fn add_table_to_schema(
        &self,
        schema_name: &str,
        table_name: &str,
        schema: SchemaRef,
    ) -> Result<()> {
        let schema_entry = self
            .get_schema(schema_name)
            .ok_or_else(|| Error::Execution(format!("Schema {schema_name} not found")))?;
        if schema_entry.tables.contains_key(table_name) {
            return Err(Error::Execution(format!(
                "Table {} already exists in schema {}",
                table_name, schema_name
            )));
        }
        let table = MemoryTable::empty(SchemaTableName::new(schema_name, table_name), schema);
        let table = Arc::new(table);
        schema_entry.tables.insert(table_name.to_string(), table);
        Ok(())
    }

    pub fn get_table_from_schema(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> Option<Arc<MemoryTable>> {
        let schema = self.schemas.get(schema_name)?;
        let table = schema.tables.get(table_name)?;
        let pinned = table.value().clone();
        Some(pinned)
    }

    /// Publishes a new version of the table with `batch` appended.
    pub fn append(&self, schema_name: &str, table_name: &str, batch: &RecordBatch) -> Result<u64> {
        let schema = self
            .get_schema(schema_name)
            .ok_or_else(|| Error::Execution(format!("Schema {schema_name} not found")))?;
        let mut entry = schema
            .tables
            .get_mut(table_name)
            .ok_or_else(|| Error::TableNotFound(format!("{schema_name}.{table_name}")))?;
        let next = entry.with_appended(batch)?;
        let version = next.version;
        *entry = Arc::new(next);
        Ok(version)
    }

    pub fn drop_table(&self, schema_name: &str, table_name: &str) -> Result<()> {
        self.get_schema(schema_name)
            .and_then(|schema| schema.tables.remove(table_name))
            .map(|_| ())
            .ok_or_else(|| Error::TableNotFound(format!("{schema_name}.{table_name}")))
    }

    /// Pins the current version of every schema and table.
    pub fn snapshot(&self) -> CatalogSnapshot {
        let schemas = self
            .schemas
            .iter()
            .map(|schema| {
                let tables: BTreeMap<String, Arc<MemoryTable>> = schema
                    .tables
                    .iter()
                    .map(|t| (t.key().clone(), t.value().clone()))
                    .collect();
                (schema.key().clone(), tables)
            })
            .collect();
        CatalogSnapshot { schemas }
    }
}

/// Catalog state as of one transaction's start.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    schemas: BTreeMap<String, BTreeMap<String, Arc<MemoryTable>>>,
}

impl CatalogSnapshot {
    pub fn schema_names(&self) -> impl Iterator<Item = &String> {
        self.schemas.keys()
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<&Arc<MemoryTable>> {
        self.schemas
            .get(schema)
            .and_then(|tables| tables.get(table))
    }

    pub fn tables_in(&self, schema: &str) -> impl Iterator<Item = &Arc<MemoryTable>> {
        self.schemas
            .get(schema)
            .into_iter()
            .flat_map(|tables| tables.values())
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<MemoryTable>> {
        self.schemas.values().flat_map(|tables| tables.values())
    }
}
