use std::collections::BTreeMap;
use std::sync::Arc;

use igloo_common::{Error, Result, SchemaTableName};
use igloo_connector::SystemTable;

/// The fixed set of system tables, keyed by name.
///
/// Built once when the connector is constructed. There is no way to add or
/// remove a table afterwards, so the registry is shared without locking.
#[derive(Debug, Clone, Default)]
pub struct SystemTableRegistry {
    tables: Arc<BTreeMap<SchemaTableName, Arc<dyn SystemTable>>>,
}

impl SystemTableRegistry {
    pub fn new(tables: impl IntoIterator<Item = Arc<dyn SystemTable>>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for table in tables {
            let name = table.name().clone();
            if map.insert(name.clone(), table).is_some() {
                let msg = format!("duplicate system table {name}");
                return Err(Error::InvalidIdentifier(msg));
            }
        }
        Ok(Self {
            tables: Arc::new(map),
        })
    }

    pub fn get(&self, name: &SchemaTableName) -> Option<&Arc<dyn SystemTable>> {
        self.tables.get(name)
    }

    /// Tables in name order.
    pub fn tables(&self) -> Vec<Arc<dyn SystemTable>> {
        self.tables.values().cloned().collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &SchemaTableName> {
        self.tables.keys()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
