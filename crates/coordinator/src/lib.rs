//! Igloo coordinator
//!
//! Wires the connector framework together: settings, the connector registry
//! with its handle resolvers, and engine-side transactions spanning several
//! connectors.

pub mod config;
pub mod connector_manager;
pub mod error;
pub mod transaction;

use std::sync::Arc;

use igloo_common::{ConnectorId, TransactionId};
use igloo_connector::{Connector, SystemTable};
use igloo_connector_memory::MemoryConnector;
use igloo_connector_system::{CatalogsTable, GlobalSystemConnector, NodeInfo, NodesTable};
use tracing::info;

pub use config::{MemorySettings, Settings};
pub use connector_manager::{ConnectorManager, EncodedHandle, HandleResolverRegistry};
pub use error::{CoordinatorError, Result};
pub use transaction::TransactionManager;

/// A coordinator with the built-in system connector and one memory catalog.
#[derive(Debug)]
pub struct Coordinator {
    connectors: Arc<ConnectorManager>,
    transactions: TransactionManager,
    system: Arc<GlobalSystemConnector>,
    memory: Arc<MemoryConnector>,
}

impl Coordinator {
    pub fn bootstrap(settings: &Settings) -> Result<Self> {
        let memory_id = ConnectorId::new(settings.memory.connector_id.as_str())?;
        let system_id = ConnectorId::new(settings.system_connector_id.as_str())?;
        if memory_id == system_id {
            return Err(CoordinatorError::DuplicateConnector(memory_id.to_string()));
        }

        let memory = Arc::new(MemoryConnector::new(
            memory_id.clone(),
            settings.memory.connector_config(),
        ));

        let nodes = NodesTable::new(vec![NodeInfo::coordinator(
            settings.node_id.as_str(),
            settings.node_address.as_str(),
        )]);
        let catalogs = CatalogsTable::new(vec![
            (memory_id.to_string(), "memory".to_string()),
            (system_id.to_string(), GlobalSystemConnector::NAME.to_string()),
        ]);
        let tables: Vec<Arc<dyn SystemTable>> = vec![Arc::new(nodes), Arc::new(catalogs)];
        let system = Arc::new(
            GlobalSystemConnector::new(system_id, tables)?
                .with_exposed_tables(settings.expose_system_tables),
        );

        let connectors = Arc::new(ConnectorManager::new());
        connectors.register(system.clone())?;
        connectors.register(memory.clone())?;
        info!(
            catalogs = connectors.connector_ids().len(),
            system_tables = system.registry().len(),
            expose_system_tables = settings.expose_system_tables,
            default_isolation_level = %settings.default_isolation_level,
            "coordinator ready"
        );

        let transactions =
            TransactionManager::new(connectors.clone(), settings.default_isolation_level);
        Ok(Self {
            connectors,
            transactions,
            system,
            memory,
        })
    }

    pub fn connectors(&self) -> &Arc<ConnectorManager> {
        &self.connectors
    }

    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Begins a transaction at the configured default isolation level.
    pub fn begin_transaction(&self, read_only: bool) -> TransactionId {
        self.transactions.begin_default(read_only)
    }

    pub fn system(&self) -> &Arc<GlobalSystemConnector> {
        &self.system
    }

    pub fn memory(&self) -> &Arc<MemoryConnector> {
        &self.memory
    }

    /// System tables reached through the direct path.
    pub fn system_tables(&self) -> Vec<Arc<dyn SystemTable>> {
        self.system.system_tables()
    }
}
