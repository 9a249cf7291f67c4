use std::fmt::Debug;
use std::sync::Arc;

use igloo_common::{ConnectorId, Result, TransactionId};

use crate::metadata::ConnectorMetadata;
use crate::page_source::PageSourceProvider;
use crate::resolver::HandleResolver;
use crate::split::SplitManager;
use crate::system_table::SystemTable;
use crate::transaction::{ConnectorTransactionHandle, IsolationLevel};

/// Broad category of a connector, derived from its capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorKind {
    FullCapability,
    ReadOnly,
    SystemOnly,
}

/// What a connector offers. Callers check these instead of probing for
/// `NotSupported` errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Generic schema/table/column resolution returns real results.
    pub metadata: bool,
    pub splits: bool,
    pub page_sources: bool,
    pub system_tables: bool,
    pub writes: bool,
}

impl Capabilities {
    pub fn read_only() -> Self {
        Self {
            metadata: true,
            splits: true,
            page_sources: true,
            ..Default::default()
        }
    }

    pub fn system_only() -> Self {
        Self {
            system_tables: true,
            ..Default::default()
        }
    }

    pub fn can_scan(&self) -> bool {
        self.metadata && self.splits && self.page_sources
    }

    pub fn kind(&self) -> ConnectorKind {
        if self.writes {
            ConnectorKind::FullCapability
        } else if self.can_scan() {
            ConnectorKind::ReadOnly
        } else {
            ConnectorKind::SystemOnly
        }
    }
}

/// The core trait for any Igloo data source connector.
///
/// Accessors are cheap to call repeatedly. Everything returned is bound to a
/// transaction, either at creation (`metadata`) or through the transaction
/// handle passed with each call (splits and page sources).
pub trait Connector: Debug + Send + Sync {
    fn connector_id(&self) -> &ConnectorId;

    fn capabilities(&self) -> Capabilities;

    fn kind(&self) -> ConnectorKind {
        self.capabilities().kind()
    }

    /// Allocates a fresh handle for `transaction_id`. Fails with
    /// `InvalidIsolationLevel` before any state is created when the connector
    /// cannot honor `isolation_level`.
    fn begin_transaction(
        &self,
        transaction_id: TransactionId,
        isolation_level: IsolationLevel,
        read_only: bool,
    ) -> Result<ConnectorTransactionHandle>;

    fn commit(&self, _transaction: &ConnectorTransactionHandle) -> Result<()> {
        Ok(())
    }

    fn rollback(&self, _transaction: &ConnectorTransactionHandle) -> Result<()> {
        Ok(())
    }

    fn handle_resolver(&self) -> Arc<dyn HandleResolver>;

    fn metadata(
        &self,
        transaction: &ConnectorTransactionHandle,
    ) -> Result<Arc<dyn ConnectorMetadata>>;

    fn split_manager(&self) -> Result<Arc<dyn SplitManager>>;

    fn page_source_provider(&self) -> Result<Arc<dyn PageSourceProvider>>;

    fn system_tables(&self) -> Vec<Arc<dyn SystemTable>> {
        Vec::new()
    }
}
