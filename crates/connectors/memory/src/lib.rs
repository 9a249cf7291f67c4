//! Memory connector
//!
//! A reference connector keeping Arrow tables in memory. Tables can change
//! at any time through [`MemoryConnector::append`] and friends; each
//! transaction pins the catalog as of `begin_transaction`, so two concurrent
//! transactions never see each other's view shift underneath them.
//!
//! # Example
//! ```rust
//! use igloo_common::{ConnectorId, TransactionId};
//! use igloo_connector::{Connector, IsolationLevel};
//! use igloo_connector_memory::{MemoryConfig, MemoryConnector};
//!
//! let id = ConnectorId::new("memory").unwrap();
//! let connector = MemoryConnector::new(id, MemoryConfig::default());
//! connector.create_schema("default").unwrap();
//! let tx = connector
//!     .begin_transaction(TransactionId::create(), IsolationLevel::ReadCommitted, true)
//!     .unwrap();
//! assert_eq!(connector.active_transactions(), 1);
//! connector.commit(&tx).unwrap();
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use dashmap::DashMap;
use igloo_common::{ConnectorId, Error, Result, TransactionId};
use igloo_connector::{
    check_isolation_level, Capabilities, Connector, ConnectorMetadata, ConnectorTransactionHandle,
    HandleResolver, HandleTypes, IsolationLevel, PageSourceProvider, SplitManager,
    TypedHandleResolver,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod catalog;
pub mod metadata;
pub mod scan;

pub use catalog::{Catalog, CatalogSnapshot, MemoryTable};
pub use metadata::MemoryMetadata;
pub use scan::{MemoryPageSource, MemoryPageSourceProvider, MemorySplitManager, MemorySplitSource};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_rows_per_split")]
    pub rows_per_split: usize,
    #[serde(default = "default_rows_per_page")]
    pub rows_per_page: usize,
}

fn default_rows_per_split() -> usize {
    1024
}

fn default_rows_per_page() -> usize {
    256
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            rows_per_split: default_rows_per_split(),
            rows_per_page: default_rows_per_page(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTableHandle {
    pub schema: String,
    pub table: String,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryColumnHandle {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub ordinal: usize,
}

/// Rows `[start, end)` of one table version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySplit {
    pub schema: String,
    pub table: String,
    pub version: u64,
    pub start: usize,
    pub end: usize,
}

pub struct MemoryHandles;

impl HandleTypes for MemoryHandles {
    type Table = MemoryTableHandle;
    type Column = MemoryColumnHandle;
    type Split = MemorySplit;
    type Transaction = ();
}

/// Per-transaction state: the pinned catalog.
#[derive(Debug)]
pub struct TransactionState {
    pub isolation_level: IsolationLevel,
    pub read_only: bool,
    pub snapshot: Arc<CatalogSnapshot>,
}

/// State shared between the connector and the metadata, split manager and
/// page source provider it hands out.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) connector_id: ConnectorId,
    pub(crate) config: MemoryConfig,
    pub(crate) transactions: DashMap<TransactionId, Arc<TransactionState>>,
    pub(crate) open_page_sources: Arc<AtomicUsize>,
}

impl Shared {
    /// State of a live transaction; `UnknownTransaction` once it has ended.
    pub(crate) fn transaction_state(
        &self,
        handle: &ConnectorTransactionHandle,
    ) -> Result<Arc<TransactionState>> {
        handle.check_connector(&self.connector_id)?;
        self.transactions
            .get(&handle.transaction_id())
            .map(|s| s.value().clone())
            .ok_or_else(|| Error::UnknownTransaction(handle.to_string()))
    }

    /// Like `transaction_state`, but an ended transaction reports
    /// `TableNotFound`: every table handle it issued is gone.
    pub(crate) fn live_transaction(
        &self,
        handle: &ConnectorTransactionHandle,
    ) -> Result<Arc<TransactionState>> {
        self.transaction_state(handle).map_err(|e| match e {
            Error::UnknownTransaction(_) => {
                Error::TableNotFound(format!("transaction {} has ended", handle))
            }
            other => other,
        })
    }
}

#[derive(Debug)]
pub struct MemoryConnector {
    catalog: Catalog,
    shared: Arc<Shared>,
}

impl MemoryConnector {
    /// Snapshots give repeatable reads; read-only transactions over a
    /// snapshot are also serializable.
    pub const MAX_ISOLATION_LEVEL: IsolationLevel = IsolationLevel::RepeatableRead;

    pub fn new(connector_id: ConnectorId, config: MemoryConfig) -> Self {
        let config = MemoryConfig {
            rows_per_split: config.rows_per_split.max(1),
            rows_per_page: config.rows_per_page.max(1),
        };
        Self {
            catalog: Catalog::new(),
            shared: Arc::new(Shared {
                connector_id,
                config,
                transactions: DashMap::new(),
                open_page_sources: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    pub fn create_schema(&self, name: &str) -> Result<()> {
        self.catalog.add_schema(name)
    }

    pub fn create_table(&self, schema: &str, table: &str, arrow_schema: SchemaRef) -> Result<()> {
        self.catalog
            .add_table_to_schema(schema, table, arrow_schema)?;
        info!(connector = %self.shared.connector_id, schema, table, "created table");
        Ok(())
    }

    /// Returns the new table version.
    pub fn append(&self, schema: &str, table: &str, batch: &RecordBatch) -> Result<u64> {
        let version = self.catalog.append(schema, table, batch)?;
        debug!(
            connector = %self.shared.connector_id,
            schema,
            table,
            version,
            rows = batch.num_rows(),
            "appended rows"
        );
        Ok(version)
    }

    pub fn drop_table(&self, schema: &str, table: &str) -> Result<()> {
        self.catalog.drop_table(schema, table)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.shared.config
    }

    pub fn active_transactions(&self) -> usize {
        self.shared.transactions.len()
    }

    /// Page sources created and not yet closed or dropped.
    pub fn open_page_sources(&self) -> usize {
        self.shared.open_page_sources.load(Ordering::SeqCst)
    }

    fn end_transaction(
        &self,
        transaction: &ConnectorTransactionHandle,
        action: &str,
    ) -> Result<()> {
        transaction.check_connector(&self.shared.connector_id)?;
        self.shared
            .transactions
            .remove(&transaction.transaction_id())
            .ok_or_else(|| Error::UnknownTransaction(transaction.to_string()))?;
        debug!(
            connector = %self.shared.connector_id,
            transaction = %transaction.transaction_id(),
            action,
            "ended transaction"
        );
        Ok(())
    }
}

impl Connector for MemoryConnector {
    fn connector_id(&self) -> &ConnectorId {
        &self.shared.connector_id
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::read_only()
    }

    fn begin_transaction(
        &self,
        transaction_id: TransactionId,
        isolation_level: IsolationLevel,
        read_only: bool,
    ) -> Result<ConnectorTransactionHandle> {
        let supported = if read_only {
            IsolationLevel::Serializable
        } else {
            Self::MAX_ISOLATION_LEVEL
        };
        check_isolation_level(&self.shared.connector_id, supported, isolation_level)?;

        let handle =
            ConnectorTransactionHandle::new(self.shared.connector_id.clone(), transaction_id);
        let state = TransactionState {
            isolation_level,
            read_only,
            snapshot: Arc::new(self.catalog.snapshot()),
        };
        self.shared
            .transactions
            .insert(transaction_id, Arc::new(state));
        debug!(
            connector = %self.shared.connector_id,
            transaction = %transaction_id,
            %isolation_level,
            read_only,
            "began transaction"
        );
        Ok(handle)
    }

    fn commit(&self, transaction: &ConnectorTransactionHandle) -> Result<()> {
        self.end_transaction(transaction, "commit")
    }

    fn rollback(&self, transaction: &ConnectorTransactionHandle) -> Result<()> {
        self.end_transaction(transaction, "rollback")
    }

    fn handle_resolver(&self) -> Arc<dyn HandleResolver> {
        Arc::new(TypedHandleResolver::<MemoryHandles>::new(
            self.shared.connector_id.clone(),
        ))
    }

    fn metadata(
        &self,
        transaction: &ConnectorTransactionHandle,
    ) -> Result<Arc<dyn ConnectorMetadata>> {
        self.shared.transaction_state(transaction)?;
        Ok(Arc::new(MemoryMetadata::new(
            self.shared.clone(),
            transaction.clone(),
        )))
    }

    fn split_manager(&self) -> Result<Arc<dyn SplitManager>> {
        Ok(Arc::new(MemorySplitManager::new(self.shared.clone())))
    }

    fn page_source_provider(&self) -> Result<Arc<dyn PageSourceProvider>> {
        Ok(Arc::new(MemoryPageSourceProvider::new(self.shared.clone())))
    }
}
