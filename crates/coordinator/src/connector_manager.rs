use std::sync::Arc;

use dashmap::DashMap;
use igloo_common::{ConnectorId, Error};
use igloo_connector::{
    Connector, ConnectorTransactionHandle, HandleKind, HandleResolver, OpaqueHandle,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{CoordinatorError, Result};

/// Registered connectors, keyed by connector id. Each registered connector id
/// is also a catalog name.
#[derive(Debug, Default)]
pub struct ConnectorManager {
    connectors: DashMap<ConnectorId, Arc<dyn Connector>>,
    resolvers: HandleResolverRegistry,
}

impl ConnectorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connector: Arc<dyn Connector>) -> Result<()> {
        let id = connector.connector_id().clone();
        if self.connectors.contains_key(&id) {
            return Err(CoordinatorError::DuplicateConnector(id.to_string()));
        }
        self.resolvers.register(connector.handle_resolver())?;
        info!(connector = %id, kind = ?connector.kind(), "registered connector");
        self.connectors.insert(id, connector);
        Ok(())
    }

    pub fn get(&self, id: &ConnectorId) -> Result<Arc<dyn Connector>> {
        self.connectors
            .get(id)
            .map(|c| c.value().clone())
            .ok_or_else(|| CoordinatorError::ConnectorNotFound(id.to_string()))
    }

    /// Registered connector ids, sorted.
    pub fn connector_ids(&self) -> Vec<ConnectorId> {
        let mut ids: Vec<ConnectorId> = self.connectors.iter().map(|c| c.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn resolvers(&self) -> &HandleResolverRegistry {
        &self.resolvers
    }
}

/// A handle in transport form: the owning transaction, which kind of handle it
/// is, the concrete payload type that produced it, and the payload itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedHandle {
    pub transaction: ConnectorTransactionHandle,
    pub kind: HandleKind,
    pub type_name: String,
    pub payload: Value,
}

/// Per-connector handle resolvers used to move opaque handles across a
/// process boundary and back.
#[derive(Debug, Default)]
pub struct HandleResolverRegistry {
    resolvers: DashMap<ConnectorId, Arc<dyn HandleResolver>>,
}

impl HandleResolverRegistry {
    pub fn register(&self, resolver: Arc<dyn HandleResolver>) -> Result<()> {
        let id = resolver.connector_id().clone();
        if self.resolvers.contains_key(&id) {
            return Err(CoordinatorError::DuplicateConnector(id.to_string()));
        }
        self.resolvers.insert(id, resolver);
        Ok(())
    }

    fn resolver(&self, id: &ConnectorId) -> Result<Arc<dyn HandleResolver>> {
        self.resolvers
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| CoordinatorError::ConnectorNotFound(id.to_string()))
    }

    pub fn encode<H: OpaqueHandle>(&self, handle: &H) -> Result<EncodedHandle> {
        let resolver = self.resolver(handle.connector_id())?;
        resolver.validate(H::KIND, handle.payload())?;
        Ok(EncodedHandle {
            transaction: handle.transaction().clone(),
            kind: H::KIND,
            type_name: resolver.type_name(H::KIND).to_string(),
            payload: handle.payload().clone(),
        })
    }

    /// Rebuilds a handle, rejecting tokens of another kind, tokens whose
    /// payload type differs from what the owning connector declares, and
    /// payloads that do not decode as that type.
    pub fn decode<H: OpaqueHandle>(&self, encoded: &EncodedHandle) -> Result<H> {
        if encoded.kind != H::KIND {
            return Err(Error::UnknownHandle(format!(
                "expected a {:?} handle, got {:?}",
                H::KIND,
                encoded.kind
            ))
            .into());
        }
        let resolver = self.resolver(encoded.transaction.connector_id())?;
        let expected = resolver.type_name(encoded.kind);
        if encoded.type_name != expected {
            return Err(Error::UnknownHandle(format!(
                "{} does not encode {:?} handles as {} (expected {})",
                resolver.connector_id(),
                encoded.kind,
                encoded.type_name,
                expected
            ))
            .into());
        }
        resolver.validate(encoded.kind, &encoded.payload)?;
        Ok(H::from_parts(
            encoded.transaction.clone(),
            encoded.payload.clone(),
        ))
    }
}
