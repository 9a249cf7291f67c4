use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use igloo_common::{ConnectorId, TransactionId};
use igloo_connector::{ConnectorMetadata, ConnectorTransactionHandle, IsolationLevel};
use tracing::{debug, info, warn};

use crate::connector_manager::ConnectorManager;
use crate::error::{CoordinatorError, Result};

#[derive(Debug)]
struct TransactionEntry {
    isolation_level: IsolationLevel,
    read_only: bool,
    // Connectors that joined this transaction and the handles they issued.
    connectors: DashMap<ConnectorId, ConnectorTransactionHandle>,
}

/// Engine-side transactions. A connector joins a transaction the first time
/// it is touched and keeps the same handle until commit or rollback.
#[derive(Debug)]
pub struct TransactionManager {
    connectors: Arc<ConnectorManager>,
    default_isolation_level: IsolationLevel,
    transactions: DashMap<TransactionId, TransactionEntry>,
}

impl TransactionManager {
    pub fn new(connectors: Arc<ConnectorManager>, default_isolation_level: IsolationLevel) -> Self {
        Self {
            connectors,
            default_isolation_level,
            transactions: DashMap::new(),
        }
    }

    pub fn default_isolation_level(&self) -> IsolationLevel {
        self.default_isolation_level
    }

    pub fn begin(&self, isolation_level: IsolationLevel, read_only: bool) -> TransactionId {
        let id = TransactionId::create();
        let entry = TransactionEntry {
            isolation_level,
            read_only,
            connectors: DashMap::new(),
        };
        self.transactions.insert(id, entry);
        debug!(
            transaction = %id,
            %isolation_level,
            read_only,
            "began transaction"
        );
        id
    }

    /// Begins a transaction at the configured default isolation level.
    pub fn begin_default(&self, read_only: bool) -> TransactionId {
        self.begin(self.default_isolation_level, read_only)
    }

    /// The connector's handle for this transaction, beginning the connector
    /// transaction on first use.
    pub fn connector_transaction(
        &self,
        id: TransactionId,
        connector_id: &ConnectorId,
    ) -> Result<ConnectorTransactionHandle> {
        // The entry guard is held until the join is recorded, so a concurrent
        // commit or rollback either sees this connector or runs first and
        // makes the lookup fail.
        let entry = self
            .transactions
            .get(&id)
            .ok_or_else(|| CoordinatorError::TransactionNotFound(id.to_string()))?;
        let handle = match entry.connectors.entry(connector_id.clone()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(vacant) => {
                let connector = self.connectors.get(connector_id)?;
                let handle =
                    connector.begin_transaction(id, entry.isolation_level, entry.read_only)?;
                vacant.insert(handle.clone());
                handle
            }
        };
        Ok(handle)
    }

    pub fn metadata(
        &self,
        id: TransactionId,
        connector_id: &ConnectorId,
    ) -> Result<Arc<dyn ConnectorMetadata>> {
        let handle = self.connector_transaction(id, connector_id)?;
        Ok(self.connectors.get(connector_id)?.metadata(&handle)?)
    }

    pub fn commit(&self, id: TransactionId) -> Result<()> {
        self.finish(id, true)
    }

    pub fn rollback(&self, id: TransactionId) -> Result<()> {
        self.finish(id, false)
    }

    /// Ends every participating connector transaction; the first failure is
    /// reported after all connectors have been told.
    fn finish(&self, id: TransactionId, commit: bool) -> Result<()> {
        let (_, entry) = self
            .transactions
            .remove(&id)
            .ok_or_else(|| CoordinatorError::TransactionNotFound(id.to_string()))?;

        let mut first_error = None;
        for (connector_id, handle) in entry.connectors {
            let result = self.connectors.get(&connector_id).and_then(|connector| {
                let ended = if commit {
                    connector.commit(&handle)
                } else {
                    connector.rollback(&handle)
                };
                ended.map_err(CoordinatorError::from)
            });
            if let Err(e) = result {
                warn!(
                    transaction = %id,
                    connector = %connector_id,
                    error = %e,
                    "failed to end connector transaction"
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        let action = if commit { "commit" } else { "rollback" };
        info!(transaction = %id, action, "ended transaction");
        first_error.map_or(Ok(()), Err)
    }

    pub fn active_transactions(&self) -> Vec<TransactionId> {
        self.transactions.iter().map(|t| *t.key()).collect()
    }
}
