//! System connector
//!
//! Exposes the engine's built-in diagnostic tables under the `system`
//! connector id. The tables are computed on demand from state handed over at
//! construction and are never split.
//!
//! By default the generic metadata path is a stub and the engine reaches the
//! tables through `Connector::system_tables`. With
//! [`GlobalSystemConnector::with_exposed_tables`] the same tables also resolve
//! through the generic metadata, split and page source path, so they can take
//! part in queries next to regular catalog tables.

use std::sync::Arc;

use igloo_common::{ConnectorId, Error, Result, SchemaTableName, TransactionId};
use igloo_connector::{
    Capabilities, Connector, ConnectorMetadata, ConnectorTransactionHandle, HandleResolver,
    HandleTypes, IsolationLevel, PageSourceProvider, SplitManager, SystemTable,
    TypedHandleResolver,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod metadata;
pub mod registry;
pub mod scan;
pub mod tables;

pub use metadata::SystemMetadata;
pub use registry::SystemTableRegistry;
pub use scan::{SystemPageSourceProvider, SystemSplitManager};
pub use tables::{CatalogsTable, NodeInfo, NodesTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTableHandle {
    pub table: SchemaTableName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemColumnHandle {
    pub table: SchemaTableName,
    pub column: String,
}

/// The single split covering a whole system table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSplit {
    pub table: SchemaTableName,
}

pub struct SystemHandles;

impl HandleTypes for SystemHandles {
    type Table = SystemTableHandle;
    type Column = SystemColumnHandle;
    type Split = SystemSplit;
    type Transaction = ();
}

#[derive(Debug)]
pub struct GlobalSystemConnector {
    connector_id: ConnectorId,
    registry: SystemTableRegistry,
    expose_tables: bool,
}

impl GlobalSystemConnector {
    pub const NAME: &'static str = "system";

    pub fn new(connector_id: ConnectorId, tables: Vec<Arc<dyn SystemTable>>) -> Result<Self> {
        Ok(Self {
            connector_id,
            registry: SystemTableRegistry::new(tables)?,
            expose_tables: false,
        })
    }

    /// Also route the tables through the generic connector path.
    pub fn with_exposed_tables(mut self, expose: bool) -> Self {
        self.expose_tables = expose;
        self
    }

    pub fn registry(&self) -> &SystemTableRegistry {
        &self.registry
    }

    fn unsupported(&self, what: &str) -> Error {
        let id = &self.connector_id;
        Error::not_supported(format!("{what} for system connector {id}"))
    }
}

impl Connector for GlobalSystemConnector {
    fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    fn capabilities(&self) -> Capabilities {
        if self.expose_tables {
            Capabilities {
                system_tables: true,
                ..Capabilities::read_only()
            }
        } else {
            Capabilities::system_only()
        }
    }

    /// Any isolation level is accepted and `read_only` is ignored: nothing
    /// here is mutable.
    fn begin_transaction(
        &self,
        transaction_id: TransactionId,
        isolation_level: IsolationLevel,
        _read_only: bool,
    ) -> Result<ConnectorTransactionHandle> {
        debug!(
            connector = %self.connector_id,
            transaction = %transaction_id,
            %isolation_level,
            "begin system transaction"
        );
        Ok(ConnectorTransactionHandle::new(
            self.connector_id.clone(),
            transaction_id,
        ))
    }

    fn handle_resolver(&self) -> Arc<dyn HandleResolver> {
        Arc::new(TypedHandleResolver::<SystemHandles>::new(
            self.connector_id.clone(),
        ))
    }

    fn metadata(
        &self,
        transaction: &ConnectorTransactionHandle,
    ) -> Result<Arc<dyn ConnectorMetadata>> {
        transaction.check_connector(&self.connector_id)?;
        Ok(Arc::new(SystemMetadata::new(
            transaction.clone(),
            self.registry.clone(),
            self.expose_tables,
        )))
    }

    fn split_manager(&self) -> Result<Arc<dyn SplitManager>> {
        if !self.expose_tables {
            return Err(self.unsupported("splits"));
        }
        let manager = SystemSplitManager::new(self.connector_id.clone(), self.registry.clone());
        Ok(Arc::new(manager))
    }

    fn page_source_provider(&self) -> Result<Arc<dyn PageSourceProvider>> {
        if !self.expose_tables {
            return Err(self.unsupported("page sources"));
        }
        let provider =
            SystemPageSourceProvider::new(self.connector_id.clone(), self.registry.clone());
        Ok(Arc::new(provider))
    }

    fn system_tables(&self) -> Vec<Arc<dyn SystemTable>> {
        self.registry.tables()
    }
}
